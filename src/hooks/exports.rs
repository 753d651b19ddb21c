//! The C interface through which an embedding engine queries and calls the hooks.

use std::ffi::{c_char, c_int, c_uint};

use crate::hooks::{hooks, Hooks};

fn has(present: bool) -> c_int {
    c_int::from(present)
}

fn abort_missing(hook: &str) -> ! {
    tracing::error!(hook, "forwarding call to a hook the harness does not define");
    std::process::abort()
}

unsafe fn forward_custom_mutator(hooks: &Hooks, data: *mut u8, size: usize, max_size: usize, seed: c_uint) -> usize {
    if !hooks.has_libfuzzer_custom_mutator() {
        abort_missing(super::ffi::CUSTOM_MUTATOR);
    }

    hooks.libfuzzer_custom_mutator_unchecked(data, size, max_size, seed)
}

#[allow(clippy::too_many_arguments)]
unsafe fn forward_custom_crossover(
    hooks: &Hooks,
    data1: *const u8,
    size1: usize,
    data2: *const u8,
    size2: usize,
    out: *mut u8,
    max_out_size: usize,
    seed: c_uint,
) -> usize {
    if !hooks.has_libfuzzer_custom_crossover() {
        abort_missing(super::ffi::CUSTOM_CROSSOVER);
    }

    hooks.libfuzzer_custom_crossover_unchecked(data1, size1, data2, size2, out, max_out_size, seed)
}

/// Returns 1 if the harness defines `LLVMFuzzerInitialize()`.
#[no_mangle]
pub extern "C" fn libafl_targets_has_libfuzzer_init() -> c_int {
    has(hooks().has_libfuzzer_init())
}

/// Calls `LLVMFuzzerInitialize()` if it exists, returns 0 otherwise.
///
/// # Safety
/// `argc` and `argv` must be valid the way they are for a C `main()`.
#[no_mangle]
pub unsafe extern "C" fn libafl_targets_libfuzzer_init(argc: *mut c_int, argv: *mut *mut *mut c_char) -> c_int {
    hooks().libfuzzer_init_raw(argc, argv)
}

/// Returns 1 if the harness defines `LLVMFuzzerCustomMutator()`.
#[no_mangle]
pub extern "C" fn libafl_targets_has_libfuzzer_custom_mutator() -> c_int {
    has(hooks().has_libfuzzer_custom_mutator())
}

/// Calls `LLVMFuzzerCustomMutator()`. Check with
/// `libafl_targets_has_libfuzzer_custom_mutator()` first, the process aborts otherwise.
///
/// # Safety
/// `data` must be valid for writes of `max_size` bytes.
#[no_mangle]
pub unsafe extern "C" fn libafl_targets_libfuzzer_custom_mutator(
    data: *mut u8,
    size: usize,
    max_size: usize,
    seed: c_uint,
) -> usize {
    forward_custom_mutator(hooks(), data, size, max_size, seed)
}

/// Returns 1 if the harness defines `LLVMFuzzerCustomCrossOver()`.
#[no_mangle]
pub extern "C" fn libafl_targets_has_libfuzzer_custom_crossover() -> c_int {
    has(hooks().has_libfuzzer_custom_crossover())
}

/// Calls `LLVMFuzzerCustomCrossOver()`. Check with
/// `libafl_targets_has_libfuzzer_custom_crossover()` first, the process aborts otherwise.
///
/// # Safety
/// All pointers must be valid for their respective sizes.
#[no_mangle]
pub unsafe extern "C" fn libafl_targets_libfuzzer_custom_crossover(
    data1: *const u8,
    size1: usize,
    data2: *const u8,
    size2: usize,
    out: *mut u8,
    max_out_size: usize,
    seed: c_uint,
) -> usize {
    forward_custom_crossover(hooks(), data1, size1, data2, size2, out, max_out_size, seed)
}
