// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

fn main() {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap();

    if cfg!(feature = "vaapi") {
        if target_os != "linux" {
            panic!("the vaapi feature is only available on linux");
        }
        println!("cargo:rustc-link-lib=va");
        println!("cargo:rustc-link-lib=va-drm");
    }
    if cfg!(feature = "opencl") {
        println!("cargo:rustc-link-lib=OpenCL");
    }
    if cfg!(feature = "level-zero") {
        println!("cargo:rustc-link-lib=ze_loader");
    }
}
