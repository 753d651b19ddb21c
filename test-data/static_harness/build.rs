const HARNESS_FILE: &str = "harness.c";

fn main() {
    cc::Build::new()
        .file(HARNESS_FILE)
        .flag("-O2")
        .compile("harness");
    
    println!("cargo:rerun-if-changed={}", HARNESS_FILE);
}
