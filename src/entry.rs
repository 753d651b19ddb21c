//! Decides who owns the process: the harness's `libafl_main()` or the fuzzing driver.
//!
//! The decision is made once, by [`Entry::decide()`]. If the harness overrides the entry point,
//! the override runs and the process exits successfully afterwards. Otherwise the single-input
//! handler of the harness is handed to `LLVMFuzzerRunDriver()` together with the process
//! arguments, and whatever the driver returns becomes the exit status.

use std::ffi::c_int;

use crate::{
    error::HookError,
    hooks::{self, ffi, CArgs, Hooks, MainOverrideFunc, RunDriverFunc, TestOneInputFunc},
};

/// The two ways a process can be run.
#[derive(Debug, Clone, Copy)]
pub enum Entry {
    /// The harness takes over via `libafl_main()`
    Override(MainOverrideFunc),
    /// The fuzzing driver repeatedly calls this single-input handler
    Driver(TestOneInputFunc),
}

impl Entry {
    /// Pick the entry path for the given hooks.
    pub fn decide(hooks: &Hooks) -> Self {
        match hooks.main_override() {
            Some(f) => Entry::Override(f),
            None => Entry::Driver(hooks.test_one_input()),
        }
    }
}

/// Something that runs the fuzzing loop, i.e. `LLVMFuzzerRunDriver()`.
pub trait Driver {
    /// Run the loop with `harness` as the single-input handler and return the exit status.
    fn run(&mut self, args: &mut CArgs, harness: TestOneInputFunc) -> Result<c_int, HookError>;
}

impl<F> Driver for F
where
    F: FnMut(&mut CArgs, TestOneInputFunc) -> c_int,
{
    fn run(&mut self, args: &mut CArgs, harness: TestOneInputFunc) -> Result<c_int, HookError> {
        Ok(self(args, harness))
    }
}

/// Calls the `LLVMFuzzerRunDriver()` that was linked into the program, if there is one.
#[derive(Debug, Default)]
pub struct ProcessDriver;

impl ProcessDriver {
    /// Create a new driver.
    pub fn new() -> Self {
        Self
    }
}

impl Driver for ProcessDriver {
    fn run(&mut self, args: &mut CArgs, harness: TestOneInputFunc) -> Result<c_int, HookError> {
        let run_driver: RunDriverFunc = ffi::linked_run_driver().ok_or(HookError::Missing(ffi::RUN_DRIVER))?;

        Ok(unsafe { run_driver(args.argc_mut(), args.argv_mut(), harness) })
    }
}

#[cfg(feature = "static-driver")]
extern "C" {
    fn LLVMFuzzerRunDriver(
        argc: *mut c_int,
        argv: *mut *mut *mut std::ffi::c_char,
        callback: TestOneInputFunc,
    ) -> c_int;
}

/// Calls a `LLVMFuzzerRunDriver()` that is linked into the binary.
#[cfg(feature = "static-driver")]
#[derive(Debug, Default)]
pub struct LinkedDriver;

#[cfg(feature = "static-driver")]
impl Driver for LinkedDriver {
    fn run(&mut self, args: &mut CArgs, harness: TestOneInputFunc) -> Result<c_int, HookError> {
        Ok(unsafe { LLVMFuzzerRunDriver(args.argc_mut(), args.argv_mut(), harness) })
    }
}

/// Run whichever entry path `hooks` selects.
///
/// The override path never touches `driver` and yields 0. The driver path yields the status
/// of the driver unchanged.
pub fn dispatch<D: Driver>(hooks: &Hooks, mut driver: D, args: &mut CArgs) -> Result<c_int, HookError> {
    match Entry::decide(hooks) {
        Entry::Override(f) => {
            tracing::info!("handing the process to libafl_main()");
            unsafe { f() };
            Ok(0)
        },
        Entry::Driver(harness) => {
            tracing::info!(
                argc = args.argc(),
                custom_harness = hooks.has_test_one_input(),
                "handing the harness to LLVMFuzzerRunDriver()"
            );
            driver.run(args, harness)
        },
    }
}

/// What `main()` does: dispatch with the process-wide hooks and the process arguments.
pub fn run_main() -> Result<c_int, HookError> {
    let mut args = CArgs::from_env()?;

    #[cfg(feature = "static-driver")]
    let driver = LinkedDriver;
    #[cfg(not(feature = "static-driver"))]
    let driver = ProcessDriver::new();

    dispatch(hooks::hooks(), driver, &mut args)
}
