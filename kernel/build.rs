fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    if target_os == "none" {
        println!("cargo:rustc-link-arg-bins=--script={manifest_dir}/linker.ld");
    }
    println!("cargo:rerun-if-changed=linker.ld");
}
