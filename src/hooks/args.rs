//! An owned argc/argv pair that can be handed to C.

use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;

use crate::error::HookError;

/// An owned, C-compatible argument vector.
///
/// `argc` and `argv` are exposed through raw pointers so that
/// `LLVMFuzzerInitialize()` and `LLVMFuzzerRunDriver()` can rewrite them the
/// way they would rewrite the arguments of a C `main()`. The nul-terminated
/// buffers backing the original vector are owned and writable, C may modify
/// them in place, and they live as long as this value.
pub struct CArgs {
    _buffers: Vec<Vec<u8>>,
    pointers: Vec<*mut c_char>,
    argc: c_int,
    argv: *mut *mut c_char,
}

impl CArgs {
    /// Build an argument vector from arbitrary byte strings.
    pub fn new<I, S>(args: I) -> Result<Self, HookError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        let mut buffers = args
            .into_iter()
            .map(|arg| CString::new(arg).map(CString::into_bytes_with_nul))
            .collect::<Result<Vec<_>, _>>()?;

        let argc = c_int::try_from(buffers.len()).map_err(|_| HookError::SizeOutOfBounds {
            size: buffers.len(),
            capacity: c_int::MAX as usize,
        })?;

        let mut pointers: Vec<*mut c_char> = buffers
            .iter_mut()
            .map(|buf| buf.as_mut_ptr() as *mut c_char)
            .collect();
        pointers.push(ptr::null_mut());
        let argv = pointers.as_mut_ptr();

        Ok(Self {
            _buffers: buffers,
            pointers,
            argc,
            argv,
        })
    }

    /// Build an argument vector from the arguments of the current process.
    #[cfg(unix)]
    pub fn from_env() -> Result<Self, HookError> {
        use std::os::unix::ffi::OsStringExt;

        Self::new(std::env::args_os().map(OsStringExt::into_vec))
    }

    /// Build an argument vector from the arguments of the current process.
    #[cfg(not(unix))]
    pub fn from_env() -> Result<Self, HookError> {
        Self::new(std::env::args_os().map(|arg| arg.to_string_lossy().into_owned()))
    }

    /// The current argument count.
    pub fn argc(&self) -> c_int {
        self.argc
    }

    /// Pointer to the argument count, suitable for `int *argc`.
    pub fn argc_mut(&mut self) -> *mut c_int {
        &mut self.argc
    }

    /// Pointer to the argument vector, suitable for `char ***argv`.
    pub fn argv_mut(&mut self) -> *mut *mut *mut c_char {
        &mut self.argv
    }

    /// Returns true if argc/argv still describe the vector this value was built from.
    pub fn is_original(&self) -> bool {
        ptr::eq(self.argv, self.pointers.as_ptr())
            && usize::try_from(self.argc).is_ok_and(|argc| argc + 1 == self.pointers.len())
    }

    /// Read back the arguments that argc/argv currently describe.
    ///
    /// Foreign code may have pointed argv at memory of its own. That memory
    /// must stay valid and nul-terminated for `argc` entries.
    pub fn to_vec(&self) -> Vec<String> {
        if self.argv.is_null() || self.argc <= 0 {
            return Vec::new();
        }

        (0..self.argc as usize)
            .map(|i| unsafe { *self.argv.add(i) })
            .take_while(|arg| !arg.is_null())
            .map(|arg| unsafe { CStr::from_ptr(arg) }.to_string_lossy().into_owned())
            .collect()
    }
}

impl std::fmt::Debug for CArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CArgs")
            .field("argc", &self.argc)
            .field("argv", &self.to_vec())
            .finish()
    }
}
