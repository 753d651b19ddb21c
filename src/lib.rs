//! This library lets a LibAFL-based engine run harnesses that were written for libFuzzer.
//!
//! A libFuzzer harness defines `LLVMFuzzerTestOneInput()` and optionally `LLVMFuzzerInitialize()`,
//! `LLVMFuzzerCustomMutator()` and `LLVMFuzzerCustomCrossOver()`. None of that needs to change.
//!
//! It consists of
//! - __hooks__: Find out which of the optional hooks a harness defines and call them.
//!   The same checks are exported to C as `libafl_targets_has_libfuzzer_*()` / `libafl_targets_libfuzzer_*()`.
//! - __entry__: Decide at process start whether the harness's `libafl_main()` or
//!   `LLVMFuzzerRunDriver()` owns the process.
//! - __components__: LibAFL mutators and a harness adapter built on the hooks.
//!
//! ## Getting Started
//! Resolve the hooks once and ask them what the harness supports:
//! ```no_run
//! use libfuzzer_compat::hooks::{self, CArgs};
//!
//! let hooks = hooks::hooks();
//!
//! let mut args = CArgs::from_env().unwrap();
//! hooks.libfuzzer_init(&mut args);
//!
//! if hooks.has_libfuzzer_custom_mutator() {
//!     let mut buf = vec![0; 4096];
//!     let new_size = hooks.libfuzzer_custom_mutator(&mut buf, 0, 1234).unwrap();
//!     buf.truncate(new_size);
//! }
//! ```
//! To hand the whole process over, call [`entry::run_main()`] from `main()` or use the
//! `libfuzzer-main` binary.
//!
//! ## Feature flags
//! - `link-main`: Build the `libfuzzer-main` binary. On by default. Turn it off if you have your own `main()`.
//! - `static-driver`: Link `LLVMFuzzerRunDriver()` like any other extern function instead of looking it up
//!   in the running program.
//! - `components`: Include LibAFL components in this library. On by default.

#![deny(missing_docs)]

pub mod error;
pub mod hooks;
pub mod entry;
pub mod sancov;

#[cfg(feature = "components")]
pub mod components;
