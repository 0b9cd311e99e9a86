pub mod apply;
pub mod cache;
pub mod ensure;

use anyhow::Result;

/// Print a version normalized to three components.
pub fn normalize(version: &str) -> Result<()> {
    println!("{}", provisioner::normalize(version));
    Ok(())
}
