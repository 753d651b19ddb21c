const WEAK_FILE: &str = "src/hooks/weak.c";

fn main() {
    println!("cargo:rustc-check-cfg=cfg(weak_hooks)");
    println!("cargo:rerun-if-changed={}", WEAK_FILE);
    
    // MSVC has no weak references, hooks are only found through the other population paths there
    if std::env::var("CARGO_CFG_TARGET_ENV").as_deref() == Ok("msvc") {
        return;
    }
    
    cc::Build::new()
        .file(WEAK_FILE)
        .flag_if_supported("-fPIC")
        .compile("libfuzzer_compat_weak");
    
    println!("cargo:rustc-cfg=weak_hooks");
}
