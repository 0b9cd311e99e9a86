//! Platform detection for download URLs and cache keys.
//!
//! # Example
//!
//! ```
//! use provisioner::platform;
//!
//! let platform = platform::detect().expect("unsupported platform");
//! println!("Running on: {} ({})", platform.triple, platform.node_arch());
//! ```

use crate::error::{Error, Result};
use crate::types::Platform;

/// Detect the current platform.
///
/// # Supported Platforms
///
/// | OS      | Arch    | Triple                       |
/// |---------|---------|------------------------------|
/// | macOS   | ARM64   | aarch64-apple-darwin         |
/// | macOS   | x86_64  | x86_64-apple-darwin          |
/// | Linux   | ARM64   | aarch64-unknown-linux-gnu    |
/// | Linux   | x86_64  | x86_64-unknown-linux-gnu     |
/// | Linux   | ARMv7   | armv7-unknown-linux-gnueabihf|
/// | Linux   | RISC-V  | riscv64gc-unknown-linux-gnu  |
/// | Windows | ARM64   | aarch64-pc-windows-msvc      |
/// | Windows | x86_64  | x86_64-pc-windows-msvc       |
/// | Windows | x86     | i686-pc-windows-msvc         |
///
/// # Errors
///
/// Returns `Error::UnsupportedPlatform` if the current platform is not supported.
pub fn detect() -> Result<Platform> {
    from_parts(std::env::consts::OS, std::env::consts::ARCH)
}

/// Build a platform from an OS/arch pair as reported by `std::env::consts`.
pub fn from_parts(os: &str, arch: &str) -> Result<Platform> {
    let triple = match (os, arch) {
        // macOS
        ("macos", "aarch64") => "aarch64-apple-darwin",
        ("macos", "x86_64") => "x86_64-apple-darwin",

        // Linux (glibc)
        ("linux", "aarch64") => "aarch64-unknown-linux-gnu",
        ("linux", "x86_64") => "x86_64-unknown-linux-gnu",
        ("linux", "arm") => "armv7-unknown-linux-gnueabihf",
        ("linux", "riscv64") => "riscv64gc-unknown-linux-gnu",

        // Windows
        ("windows", "aarch64") => "aarch64-pc-windows-msvc",
        ("windows", "x86_64") => "x86_64-pc-windows-msvc",
        ("windows", "x86") => "i686-pc-windows-msvc",

        _ => {
            return Err(Error::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            });
        }
    };

    Ok(Platform::new(os, arch, triple))
}
