use std::{env, path::PathBuf};

fn main() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let board = env::var_os("CARGO_FEATURE_BSP_OMAP3").is_some();

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let ld_script = manifest_dir.join("src/bsp/omap3/link.ld");

    println!("cargo:rerun-if-changed={}", ld_script.display());

    // Host builds only run the unit tests; the linker script is for the bare-metal image.
    if target_os == "none" && board {
        println!("cargo:rustc-link-arg-bins=--script={}", ld_script.display());
    }
}
