//! Detection of and forwarding to the optional libFuzzer hooks of a harness.
//!
//! A harness written for libFuzzer always defines `LLVMFuzzerTestOneInput()` and may
//! additionally define
//! - `LLVMFuzzerInitialize()`
//! - `LLVMFuzzerCustomMutator()`
//! - `LLVMFuzzerCustomCrossOver()`
//! - `libafl_main()`, which replaces the whole fuzzing loop
//!
//! C gets away with weak symbols here. We resolve every hook exactly once into a
//! [`Hooks`] registry where an absent hook is simply `None`. The registry can be populated
//! in three ways:
//! - __process__ (default): [`Hooks::from_process()`] reports what was linked into the program.
//!   The crate weakly references every hook from a small C object, so the linker decides presence
//!   just like it does for libFuzzer. Targets without weak references (MSVC) report every hook absent.
//! - __dynamic__: [`Hooks::load()`] opens a harness that was compiled into a shared object.
//! - __static__: [`Hooks::builder()`] takes function pointers directly.
//!   For an example see `test-data/static_harness/src/main.rs`.
//!
//! Every hook can be queried with a `has_*()` method. The forwarding methods check presence
//! themselves and return [`HookError::Missing`] for absent hooks. The `*_unchecked()` variants
//! leave the check to the caller.
//!
//! Most programs use the process-wide registry through the free functions of this module,
//! which is populated by [`install()`] or on first use from the running process.

pub mod args;
pub(crate) mod exports;
pub(crate) mod ffi;

use std::ffi::{c_char, c_int, c_uint};
use std::path::Path;
use std::sync::OnceLock;
use libloading::Library;

use crate::error::HookError;

pub use args::CArgs;
pub use ffi::{
    CustomCrossOverFunc, CustomMutatorFunc, InitializeFunc, MainOverrideFunc, RunDriverFunc,
    TestOneInputFunc,
};

/// The hooks a harness provides.
#[derive(Default)]
pub struct Hooks {
    initialize: Option<InitializeFunc>,
    custom_mutator: Option<CustomMutatorFunc>,
    custom_crossover: Option<CustomCrossOverFunc>,
    test_one_input: Option<TestOneInputFunc>,
    main_override: Option<MainOverrideFunc>,
    library: Option<Library>,
}

impl Hooks {
    /// A registry where every hook is absent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start registering statically linked hooks.
    pub fn builder() -> HooksBuilder {
        HooksBuilder::new()
    }

    /// The hooks that were linked into the running program.
    ///
    /// Every hook is weakly referenced by this crate, so a definition anywhere in the final
    /// link (objects, static archives or shared libraries the program depends on) is found.
    pub fn from_process() -> Self {
        let linked = ffi::linked_symbols();
        let hooks = Self {
            initialize: linked.initialize,
            custom_mutator: linked.custom_mutator,
            custom_crossover: linked.custom_crossover,
            test_one_input: linked.test_one_input,
            main_override: linked.main_override,
            library: None,
        };

        tracing::debug!(hooks = ?hooks, "resolved linked hooks");
        hooks
    }

    /// Load a harness that has been compiled into a shared object via dlopen().
    ///
    /// The shared object stays loaded for as long as the returned registry lives.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HookError> {
        let lib = ffi::open(path.as_ref())?;
        let hooks = Self::resolve(lib);

        if hooks.test_one_input.is_none() {
            return Err(HookError::Missing(ffi::TEST_ONE_INPUT));
        }

        Ok(hooks)
    }

    fn resolve(lib: Library) -> Self {
        let hooks = Self {
            initialize: ffi::lookup(&lib, ffi::INITIALIZE),
            custom_mutator: ffi::lookup(&lib, ffi::CUSTOM_MUTATOR),
            custom_crossover: ffi::lookup(&lib, ffi::CUSTOM_CROSSOVER),
            test_one_input: ffi::lookup(&lib, ffi::TEST_ONE_INPUT),
            main_override: ffi::lookup(&lib, ffi::MAIN_OVERRIDE),
            library: Some(lib),
        };

        tracing::debug!(hooks = ?hooks, "resolved harness hooks");
        hooks
    }

    /// Whether the harness defines `LLVMFuzzerInitialize()`.
    pub fn has_libfuzzer_init(&self) -> bool {
        self.initialize.is_some()
    }

    /// Forward to `LLVMFuzzerInitialize()` with the given arguments.
    ///
    /// A harness without an initializer needs no initialization, so this returns 0 when
    /// the hook is absent. The harness may rewrite `args`.
    pub fn libfuzzer_init(&self, args: &mut CArgs) -> c_int {
        unsafe { self.libfuzzer_init_raw(args.argc_mut(), args.argv_mut()) }
    }

    /// Forward to `LLVMFuzzerInitialize()` with raw argc/argv pointers.
    ///
    /// # Safety
    /// `argc` and `argv` must be valid the way they are for a C `main()`.
    pub unsafe fn libfuzzer_init_raw(&self, argc: *mut c_int, argv: *mut *mut *mut c_char) -> c_int {
        match self.initialize {
            Some(f) => f(argc, argv),
            None => 0,
        }
    }

    /// Whether the harness defines `LLVMFuzzerCustomMutator()`.
    pub fn has_libfuzzer_custom_mutator(&self) -> bool {
        self.custom_mutator.is_some()
    }

    /// Forward to `LLVMFuzzerCustomMutator()`.
    ///
    /// The first `size` bytes of `data` are the input to mutate, the whole of `data`
    /// may be used by the mutator, so `data.len()` is passed as `MaxSize`.
    /// The return value of the hook is passed through unchanged.
    pub fn libfuzzer_custom_mutator(&self, data: &mut [u8], size: usize, seed: u32) -> Result<usize, HookError> {
        let f = self.custom_mutator.ok_or(HookError::Missing(ffi::CUSTOM_MUTATOR))?;

        if size > data.len() {
            return Err(HookError::SizeOutOfBounds {
                size,
                capacity: data.len(),
            });
        }

        Ok(unsafe { f(data.as_mut_ptr(), size, data.len(), seed as c_uint) })
    }

    /// Forward to `LLVMFuzzerCustomMutator()` without checking that it exists.
    ///
    /// # Safety
    /// The caller must have made sure that [`Self::has_libfuzzer_custom_mutator()`] is true
    /// and that `data` is valid for writes of `max_size` bytes.
    pub unsafe fn libfuzzer_custom_mutator_unchecked(
        &self,
        data: *mut u8,
        size: usize,
        max_size: usize,
        seed: c_uint,
    ) -> usize {
        debug_assert!(self.has_libfuzzer_custom_mutator());
        let f = self.custom_mutator.unwrap_unchecked();
        f(data, size, max_size, seed)
    }

    /// Whether the harness defines `LLVMFuzzerCustomCrossOver()`.
    pub fn has_libfuzzer_custom_crossover(&self) -> bool {
        self.custom_crossover.is_some()
    }

    /// Forward to `LLVMFuzzerCustomCrossOver()`.
    ///
    /// `out.len()` is passed as `MaxOutSize`. The return value of the hook is passed
    /// through unchanged.
    pub fn libfuzzer_custom_crossover(
        &self,
        data1: &[u8],
        data2: &[u8],
        out: &mut [u8],
        seed: u32,
    ) -> Result<usize, HookError> {
        let f = self.custom_crossover.ok_or(HookError::Missing(ffi::CUSTOM_CROSSOVER))?;

        Ok(unsafe {
            f(
                data1.as_ptr(),
                data1.len(),
                data2.as_ptr(),
                data2.len(),
                out.as_mut_ptr(),
                out.len(),
                seed as c_uint,
            )
        })
    }

    /// Forward to `LLVMFuzzerCustomCrossOver()` without checking that it exists.
    ///
    /// # Safety
    /// The caller must have made sure that [`Self::has_libfuzzer_custom_crossover()`] is true.
    /// All pointers must be valid for their respective sizes.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn libfuzzer_custom_crossover_unchecked(
        &self,
        data1: *const u8,
        size1: usize,
        data2: *const u8,
        size2: usize,
        out: *mut u8,
        max_out_size: usize,
        seed: c_uint,
    ) -> usize {
        debug_assert!(self.has_libfuzzer_custom_crossover());
        let f = self.custom_crossover.unwrap_unchecked();
        f(data1, size1, data2, size2, out, max_out_size, seed)
    }

    /// Whether the harness defines its own `LLVMFuzzerTestOneInput()`.
    pub fn has_test_one_input(&self) -> bool {
        self.test_one_input.is_some()
    }

    /// The single-input handler that gets handed to the fuzzing driver.
    ///
    /// Falls back to a handler that reports "no finding" for every input.
    pub fn test_one_input(&self) -> TestOneInputFunc {
        self.test_one_input.unwrap_or(ffi::default_test_one_input)
    }

    /// Run the single-input handler on one input and return its status.
    pub fn run_one(&self, data: &[u8]) -> c_int {
        unsafe { (self.test_one_input())(data.as_ptr(), data.len()) }
    }

    /// The entry point that overrides the fuzzing driver, if the harness has one.
    pub fn main_override(&self) -> Option<MainOverrideFunc> {
        self.main_override
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("initialize", &self.initialize.is_some())
            .field("custom_mutator", &self.custom_mutator.is_some())
            .field("custom_crossover", &self.custom_crossover.is_some())
            .field("test_one_input", &self.test_one_input.is_some())
            .field("main_override", &self.main_override.is_some())
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

/// Registers statically linked harness functions.
///
/// ```no_run
/// # use libfuzzer_compat::hooks::Hooks;
/// unsafe extern "C" fn test_one_input(_data: *const u8, _size: usize) -> std::ffi::c_int {
///     0
/// }
///
/// let hooks = Hooks::builder()
///     .test_one_input(test_one_input)
///     .build();
/// assert!(!hooks.has_libfuzzer_init());
/// ```
#[derive(Default)]
pub struct HooksBuilder {
    hooks: Hooks,
}

impl HooksBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register `LLVMFuzzerInitialize()`.
    pub fn initialize(mut self, f: InitializeFunc) -> Self {
        self.hooks.initialize = Some(f);
        self
    }

    /// Register `LLVMFuzzerCustomMutator()`.
    pub fn custom_mutator(mut self, f: CustomMutatorFunc) -> Self {
        self.hooks.custom_mutator = Some(f);
        self
    }

    /// Register `LLVMFuzzerCustomCrossOver()`.
    pub fn custom_crossover(mut self, f: CustomCrossOverFunc) -> Self {
        self.hooks.custom_crossover = Some(f);
        self
    }

    /// Register `LLVMFuzzerTestOneInput()`.
    pub fn test_one_input(mut self, f: TestOneInputFunc) -> Self {
        self.hooks.test_one_input = Some(f);
        self
    }

    /// Register `libafl_main()`.
    pub fn main_override(mut self, f: MainOverrideFunc) -> Self {
        self.hooks.main_override = Some(f);
        self
    }

    /// Finish registration. Hooks that were not registered are absent.
    pub fn build(self) -> Hooks {
        self.hooks
    }
}

static HOOKS: OnceLock<Hooks> = OnceLock::new();

/// Populate the process-wide registry. Must happen before anything queries it.
pub fn install(hooks: Hooks) -> Result<&'static Hooks, HookError> {
    let mut hooks = Some(hooks);
    let installed = HOOKS.get_or_init(|| hooks.take().unwrap_or_default());

    if hooks.is_some() {
        return Err(HookError::AlreadyInstalled);
    }

    Ok(installed)
}

/// The process-wide registry.
///
/// If [`install()`] has not been called, the hooks are resolved from the running program.
pub fn hooks() -> &'static Hooks {
    HOOKS.get_or_init(Hooks::from_process)
}

/// Whether the harness defines `LLVMFuzzerInitialize()`.
pub fn has_libfuzzer_init() -> bool {
    hooks().has_libfuzzer_init()
}

/// Forward to `LLVMFuzzerInitialize()`. Returns 0 if the harness has no initializer.
pub fn libfuzzer_init(args: &mut CArgs) -> c_int {
    hooks().libfuzzer_init(args)
}

/// Whether the harness defines `LLVMFuzzerCustomMutator()`.
pub fn has_libfuzzer_custom_mutator() -> bool {
    hooks().has_libfuzzer_custom_mutator()
}

/// Forward to `LLVMFuzzerCustomMutator()`, see [`Hooks::libfuzzer_custom_mutator()`].
pub fn libfuzzer_custom_mutator(data: &mut [u8], size: usize, seed: u32) -> Result<usize, HookError> {
    hooks().libfuzzer_custom_mutator(data, size, seed)
}

/// Whether the harness defines `LLVMFuzzerCustomCrossOver()`.
pub fn has_libfuzzer_custom_crossover() -> bool {
    hooks().has_libfuzzer_custom_crossover()
}

/// Forward to `LLVMFuzzerCustomCrossOver()`, see [`Hooks::libfuzzer_custom_crossover()`].
pub fn libfuzzer_custom_crossover(data1: &[u8], data2: &[u8], out: &mut [u8], seed: u32) -> Result<usize, HookError> {
    hooks().libfuzzer_custom_crossover(data1, data2, out, seed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    #[cfg(unix)]
    use std::path::PathBuf;
    #[cfg(unix)]
    use std::process::Command;
    use std::sync::Once;

    pub(crate) unsafe extern "C" fn doubling_mutator(data: *mut u8, size: usize, max_size: usize, _seed: c_uint) -> usize {
        let new_size = (size * 2).min(max_size);
        for i in size..new_size {
            *data.add(i) = *data.add(i - size);
        }
        new_size
    }

    pub(crate) unsafe extern "C" fn interleaving_crossover(
        data1: *const u8,
        size1: usize,
        data2: *const u8,
        size2: usize,
        out: *mut u8,
        max_out_size: usize,
        _seed: c_uint,
    ) -> usize {
        let mut written = 0;
        let mut i = 0;

        while written < max_out_size && (i < size1 || i < size2) {
            if i < size1 && written < max_out_size {
                *out.add(written) = *data1.add(i);
                written += 1;
            }
            if i < size2 && written < max_out_size {
                *out.add(written) = *data2.add(i);
                written += 1;
            }
            i += 1;
        }

        written
    }

    pub(crate) unsafe extern "C" fn crashing_input(data: *const u8, size: usize) -> c_int {
        if size > 0 && *data == b'!' {
            -1
        } else {
            0
        }
    }

    unsafe extern "C" fn drop_flags(argc: *mut c_int, argv: *mut *mut *mut c_char) -> c_int {
        let mut kept = 0;
        for i in 0..*argc as usize {
            let arg = *(*argv).add(i);
            if *arg != b'-' as c_char {
                *(*argv).add(kept) = arg;
                kept += 1;
            }
        }
        *(*argv).add(kept) = std::ptr::null_mut();
        *argc = kept as c_int;
        7
    }

    pub(crate) const LINKED_STATUS: c_int = 7;

    #[no_mangle]
    #[allow(non_snake_case)]
    pub extern "C" fn LLVMFuzzerCustomMutator(data: *mut u8, size: usize, max_size: usize, seed: c_uint) -> usize {
        unsafe { doubling_mutator(data, size, max_size, seed) }
    }

    #[no_mangle]
    #[allow(non_snake_case)]
    pub extern "C" fn LLVMFuzzerTestOneInput(_data: *const u8, _size: usize) -> c_int {
        LINKED_STATUS
    }

    /// Runs the callback once on the last argument.
    #[no_mangle]
    #[allow(non_snake_case)]
    pub unsafe extern "C" fn LLVMFuzzerRunDriver(
        argc: *mut c_int,
        argv: *mut *mut *mut c_char,
        callback: TestOneInputFunc,
    ) -> c_int {
        let last = std::ffi::CStr::from_ptr(*(*argv).add(*argc as usize - 1));
        callback(last.as_ptr() as *const u8, last.to_bytes().len())
    }

    /// The process-wide registry as every test in this crate sees it.
    pub(crate) fn installed_hooks() -> &'static Hooks {
        static INSTALL: Once = Once::new();

        INSTALL.call_once(|| {
            install(
                Hooks::builder()
                    .custom_mutator(doubling_mutator)
                    .test_one_input(crashing_input)
                    .build(),
            )
            .unwrap();
        });

        hooks()
    }

    #[cfg(unix)]
    fn compile_so(name: &str, input: &str) -> PathBuf {
        let output = std::env::temp_dir().join(format!("libfuzzer-compat-{}-{}.so", std::process::id(), name));

        let status = Command::new("cc")
            .args(["-shared", "-fPIC", "-O1", "-o"])
            .arg(&output)
            .arg(input)
            .status()
            .expect("Could not launch C compiler");
        assert!(status.success(), "Compiling {} failed", input);

        output
    }

    #[test]
    fn test_only_test_one_input() {
        let hooks = Hooks::builder()
            .test_one_input(crashing_input)
            .build();

        assert!(!hooks.has_libfuzzer_init());
        assert!(!hooks.has_libfuzzer_custom_mutator());
        assert!(!hooks.has_libfuzzer_custom_crossover());
        assert!(hooks.main_override().is_none());
        assert_eq!(hooks.run_one(b"!boom"), -1);
    }

    #[test]
    fn test_default_handler() {
        let hooks = Hooks::empty();
        assert!(!hooks.has_test_one_input());

        let inputs: [&[u8]; 4] = [b"", b"a", b"!", &[0xff; 4096]];
        for input in inputs {
            assert_eq!(hooks.run_one(input), 0);
        }
    }

    #[test]
    fn test_custom_mutator() {
        let with = Hooks::builder().custom_mutator(doubling_mutator).build();
        let without = Hooks::empty();

        assert!(with.has_libfuzzer_custom_mutator());
        assert!(!without.has_libfuzzer_custom_mutator());

        let mut data = *b"abcd\0\0\0\0\0\0";
        assert_eq!(with.libfuzzer_custom_mutator(&mut data, 4, 1337).unwrap(), 8);
        assert_eq!(&data[..8], b"abcdabcd");

        let err = without.libfuzzer_custom_mutator(&mut data, 4, 1337).unwrap_err();
        assert!(matches!(err, HookError::Missing("LLVMFuzzerCustomMutator")));
    }

    #[test]
    fn test_custom_mutator_caps_at_max_size() {
        let hooks = Hooks::builder().custom_mutator(doubling_mutator).build();
        let mut data = [1u8; 6];
        assert_eq!(hooks.libfuzzer_custom_mutator(&mut data, 4, 0).unwrap(), 6);

        let err = hooks.libfuzzer_custom_mutator(&mut data, 7, 0).unwrap_err();
        assert!(matches!(err, HookError::SizeOutOfBounds { size: 7, capacity: 6 }));
    }

    #[test]
    fn test_custom_mutator_unchecked() {
        let hooks = Hooks::builder().custom_mutator(doubling_mutator).build();
        let mut data = [7u8; 10];
        let new_size = unsafe { hooks.libfuzzer_custom_mutator_unchecked(data.as_mut_ptr(), 4, 10, 0) };
        assert_eq!(new_size, 8);
    }

    #[test]
    fn test_custom_crossover() {
        let hooks = Hooks::builder().custom_crossover(interleaving_crossover).build();
        assert!(hooks.has_libfuzzer_custom_crossover());

        let mut out = [0u8; 5];
        let written = hooks.libfuzzer_custom_crossover(b"ace", b"bdf", &mut out, 0).unwrap();
        assert_eq!(written, 5);
        assert_eq!(&out, b"abcde");

        let written = unsafe {
            hooks.libfuzzer_custom_crossover_unchecked(b"x".as_ptr(), 1, b"y".as_ptr(), 1, out.as_mut_ptr(), 5, 0)
        };
        assert_eq!(written, 2);
        assert_eq!(&out[..2], b"xy");

        let err = Hooks::empty().libfuzzer_custom_crossover(b"a", b"b", &mut out, 0).unwrap_err();
        assert!(matches!(err, HookError::Missing("LLVMFuzzerCustomCrossOver")));
    }

    #[test]
    fn test_init() {
        let hooks = Hooks::builder().initialize(drop_flags).build();
        assert!(hooks.has_libfuzzer_init());

        let mut args = CArgs::new(["fuzzer", "-runs=1", "corpus"]).unwrap();
        assert_eq!(hooks.libfuzzer_init(&mut args), 7);
        assert_eq!(args.to_vec(), vec!["fuzzer", "corpus"]);
    }

    #[test]
    fn test_init_absent() {
        let hooks = Hooks::empty();
        let mut args = CArgs::new(["fuzzer", "-runs=1"]).unwrap();
        assert_eq!(hooks.libfuzzer_init(&mut args), 0);
        assert!(args.is_original());
    }

    #[test]
    fn test_from_process() {
        // The LLVMFuzzer* definitions above are linked into this test binary
        let hooks = Hooks::from_process();
        assert!(hooks.has_libfuzzer_custom_mutator());
        assert!(hooks.has_test_one_input());
        assert!(!hooks.has_libfuzzer_init());
        assert!(!hooks.has_libfuzzer_custom_crossover());
        assert!(hooks.main_override().is_none());

        let mut data = *b"abcd\0\0\0\0\0\0";
        assert_eq!(hooks.libfuzzer_custom_mutator(&mut data, 4, 0).unwrap(), 8);
        assert_eq!(hooks.run_one(b"anything"), LINKED_STATUS);
    }

    #[cfg(unix)]
    #[test]
    fn test_load_harness() {
        let path = compile_so("harness", "test-data/static_harness/harness.c");
        let hooks = Hooks::load(&path).unwrap();

        assert!(hooks.has_test_one_input());
        assert!(hooks.has_libfuzzer_init());
        assert!(hooks.has_libfuzzer_custom_mutator());
        assert!(!hooks.has_libfuzzer_custom_crossover());
        assert!(hooks.main_override().is_none());

        let mut data = *b"FUZ\0\0\0\0\0\0\0";
        assert_eq!(hooks.libfuzzer_custom_mutator(&mut data, 4, 0).unwrap(), 8);

        // Not initialized yet
        assert_eq!(hooks.run_one(b"abc"), -1);
        let mut args = CArgs::new(["harness"]).unwrap();
        assert_eq!(hooks.libfuzzer_init(&mut args), 0);
        assert_eq!(hooks.run_one(b"abc"), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_load_rejects_missing_handler() {
        let path = compile_so("no_handler", "test-data/harnesses/no_handler.c");
        let err = Hooks::load(&path).unwrap_err();
        assert!(matches!(err, HookError::Missing("LLVMFuzzerTestOneInput")));
    }

    #[test]
    fn test_load_missing_library() {
        let err = Hooks::load("test-data/does-not-exist.so").unwrap_err();
        assert!(matches!(err, HookError::Load { .. }));
    }

    #[test]
    fn test_install_once() {
        let installed = installed_hooks();
        assert!(installed.has_libfuzzer_custom_mutator());
        assert!(has_libfuzzer_custom_mutator());
        assert!(!has_libfuzzer_init());
        assert!(!has_libfuzzer_custom_crossover());

        let mut data = [0u8; 10];
        assert_eq!(libfuzzer_custom_mutator(&mut data, 4, 0).unwrap(), 8);

        let mut args = CArgs::new(["fuzzer"]).unwrap();
        assert_eq!(libfuzzer_init(&mut args), 0);

        let err = install(Hooks::empty()).unwrap_err();
        assert!(matches!(err, HookError::AlreadyInstalled));
    }
}
