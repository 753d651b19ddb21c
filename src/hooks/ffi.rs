use std::ffi::{c_char, c_int, c_uint};
use std::path::Path;
use libloading::{Library, Symbol};

use crate::error::HookError;

/// `int LLVMFuzzerInitialize(int *argc, char ***argv)`
pub type InitializeFunc = unsafe extern "C" fn(argc: *mut c_int, argv: *mut *mut *mut c_char) -> c_int;

/// `size_t LLVMFuzzerCustomMutator(uint8_t *Data, size_t Size, size_t MaxSize, unsigned int Seed)`
pub type CustomMutatorFunc = unsafe extern "C" fn(data: *mut u8, size: usize, max_size: usize, seed: c_uint) -> usize;

/// `size_t LLVMFuzzerCustomCrossOver(const uint8_t *Data1, size_t Size1, const uint8_t *Data2, size_t Size2, uint8_t *Out, size_t MaxOutSize, unsigned int Seed)`
pub type CustomCrossOverFunc = unsafe extern "C" fn(
    data1: *const u8,
    size1: usize,
    data2: *const u8,
    size2: usize,
    out: *mut u8,
    max_out_size: usize,
    seed: c_uint,
) -> usize;

/// `int LLVMFuzzerTestOneInput(const uint8_t *Data, size_t Size)`
pub type TestOneInputFunc = unsafe extern "C" fn(data: *const u8, size: usize) -> c_int;

/// `void libafl_main(void)`
pub type MainOverrideFunc = unsafe extern "C" fn();

/// `int LLVMFuzzerRunDriver(int *argc, char ***argv, int (*UserCb)(const uint8_t *Data, size_t Size))`
pub type RunDriverFunc =
    unsafe extern "C" fn(argc: *mut c_int, argv: *mut *mut *mut c_char, callback: TestOneInputFunc) -> c_int;

pub(crate) const INITIALIZE: &str = "LLVMFuzzerInitialize";
pub(crate) const CUSTOM_MUTATOR: &str = "LLVMFuzzerCustomMutator";
pub(crate) const CUSTOM_CROSSOVER: &str = "LLVMFuzzerCustomCrossOver";
pub(crate) const TEST_ONE_INPUT: &str = "LLVMFuzzerTestOneInput";
pub(crate) const MAIN_OVERRIDE: &str = "libafl_main";
pub(crate) const RUN_DRIVER: &str = "LLVMFuzzerRunDriver";

/// Stands in for `LLVMFuzzerTestOneInput` when the harness does not define one.
pub(crate) unsafe extern "C" fn default_test_one_input(_data: *const u8, _size: usize) -> c_int {
    0
}

/// Look up a function symbol. A missing symbol is not an error, it is how
/// an optional hook reports its absence.
pub(crate) fn lookup<T: Copy>(lib: &Library, name: &str) -> Option<T> {
    let symbol: Symbol<T> = unsafe { lib.get(name.as_bytes()) }.ok()?;
    let f = *symbol;

    tracing::debug!(symbol = name, "resolved harness symbol");
    Some(f)
}

#[cfg(weak_hooks)]
extern "C" {
    fn libfuzzer_compat_linked_initialize() -> Option<InitializeFunc>;
    fn libfuzzer_compat_linked_custom_mutator() -> Option<CustomMutatorFunc>;
    fn libfuzzer_compat_linked_custom_crossover() -> Option<CustomCrossOverFunc>;
    fn libfuzzer_compat_linked_test_one_input() -> Option<TestOneInputFunc>;
    fn libfuzzer_compat_linked_main_override() -> Option<MainOverrideFunc>;
    fn libfuzzer_compat_linked_run_driver() -> Option<RunDriverFunc>;
}

/// Addresses of the hooks that were linked into the program, `None` for the ones that were not.
/// Resolved by the linker through the weak references in `weak.c`.
#[derive(Default)]
pub(crate) struct LinkedSymbols {
    pub(crate) initialize: Option<InitializeFunc>,
    pub(crate) custom_mutator: Option<CustomMutatorFunc>,
    pub(crate) custom_crossover: Option<CustomCrossOverFunc>,
    pub(crate) test_one_input: Option<TestOneInputFunc>,
    pub(crate) main_override: Option<MainOverrideFunc>,
}

#[cfg(weak_hooks)]
pub(crate) fn linked_symbols() -> LinkedSymbols {
    unsafe {
        LinkedSymbols {
            initialize: libfuzzer_compat_linked_initialize(),
            custom_mutator: libfuzzer_compat_linked_custom_mutator(),
            custom_crossover: libfuzzer_compat_linked_custom_crossover(),
            test_one_input: libfuzzer_compat_linked_test_one_input(),
            main_override: libfuzzer_compat_linked_main_override(),
        }
    }
}

#[cfg(not(weak_hooks))]
pub(crate) fn linked_symbols() -> LinkedSymbols {
    LinkedSymbols::default()
}

#[cfg(weak_hooks)]
pub(crate) fn linked_run_driver() -> Option<RunDriverFunc> {
    unsafe { libfuzzer_compat_linked_run_driver() }
}

#[cfg(not(weak_hooks))]
pub(crate) fn linked_run_driver() -> Option<RunDriverFunc> {
    None
}

pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<Library, HookError> {
    let path = path.as_ref();

    unsafe { Library::new(path) }.map_err(|source| HookError::Load {
        path: path.to_path_buf(),
        source,
    })
}
