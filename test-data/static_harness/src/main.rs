//! Runs a statically linked C harness over the files given on the command line.
//!
//! Every file is fed to the harness once, then mutated once with the harness's custom mutator
//! and fed again. This stands in for a real engine's `LLVMFuzzerRunDriver()`.

use std::ffi::{c_char, c_int, c_uint};
use tracing_subscriber::EnvFilter;
use libfuzzer_compat::{
    entry::dispatch,
    hooks::{self, CArgs, Hooks, TestOneInputFunc},
};

extern "C" {
    fn LLVMFuzzerInitialize(argc: *mut c_int, argv: *mut *mut *mut c_char) -> c_int;
    fn LLVMFuzzerTestOneInput(data: *const u8, size: usize) -> c_int;
    fn LLVMFuzzerCustomMutator(data: *mut u8, size: usize, max_size: usize, seed: c_uint) -> usize;
}

const MAX_SIZE: usize = 1024;

fn replay(args: &mut CArgs, harness: TestOneInputFunc) -> c_int {
    let hooks = hooks::hooks();
    
    if hooks.libfuzzer_init(args) != 0 {
        return 1;
    }
    
    for path in args.to_vec().iter().skip(1) {
        let mut data = std::fs::read(path).expect("Could not read input file");
        
        let status = unsafe { harness(data.as_ptr(), data.len()) };
        tracing::info!(path = %path, status, "executed input");
        
        if hooks.has_libfuzzer_custom_mutator() {
            let size = data.len();
            data.resize(MAX_SIZE.max(size), 0);
            let new_size = hooks.libfuzzer_custom_mutator(&mut data, size, 0).expect("Mutator disappeared");
            data.truncate(new_size);
            
            let status = unsafe { harness(data.as_ptr(), data.len()) };
            tracing::info!(path = %path, size = new_size, status, "executed mutated input");
        }
    }
    
    0
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    
    let hooks = hooks::install(
        Hooks::builder()
            .initialize(LLVMFuzzerInitialize)
            .test_one_input(LLVMFuzzerTestOneInput)
            .custom_mutator(LLVMFuzzerCustomMutator)
            .build()
    ).expect("Hooks were installed twice");
    
    assert!(!hooks.has_libfuzzer_custom_crossover());
    
    let mut args = CArgs::from_env().expect("Invalid command line");
    let status = dispatch(hooks, replay, &mut args).expect("Could not run harness");
    std::process::exit(status);
}
