//! Process entry point for libFuzzer harnesses.
//!
//! Link the harness and the engine providing `LLVMFuzzerRunDriver()` into this binary,
//! e.g. through `cargo:rustc-link-lib` in a build script or `RUSTFLAGS="-C link-arg=..."`.
//! Set `RUST_LOG=debug` to see which hooks were found.

use tracing_subscriber::EnvFilter;
use libfuzzer_compat::entry::run_main;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    
    let status = run_main().expect("Could not hand the harness to the fuzzing driver");
    std::process::exit(status);
}
