//! Example: put a pinned ripgrep on PATH (x86_64 Linux build)
//!
//! Run with: cargo run -p provisioner --example ensure_tool -- 14.1.0

use provisioner::Provisioner;
use provisioner::resolver::GitHubReleaseResolver;

fn main() {
    println!("ripgrep Provisioner");
    println!("===================\n");

    let version = std::env::args().nth(1).unwrap_or_else(|| "14.1.0".to_string());
    let normalized = provisioner::normalize(&version);

    let resolver = match GitHubReleaseResolver::new(
        "BurntSushi/ripgrep",
        "ripgrep-{normalized}-x86_64-unknown-linux-musl.tar.gz",
    ) {
        Ok(resolver) => resolver.tag_prefix(""),
        Err(e) => {
            eprintln!("Invalid resolver: {}", e);
            std::process::exit(1);
        }
    };

    let rg = match Provisioner::builder("ripgrep")
        .resolver(resolver)
        .bin_subpath(format!("ripgrep-{normalized}-x86_64-unknown-linux-musl"))
        .build()
    {
        Ok(rg) => rg,
        Err(e) => {
            eprintln!("Cannot set up provisioner: {}", e);
            eprintln!("  {}", e.category().advice());
            std::process::exit(1);
        }
    };

    match rg.find(&version) {
        Some(path) => println!("ripgrep {} is cached at {}", normalized, path.display()),
        None => println!("ripgrep {} is not cached. Acquiring...", normalized),
    }

    match rg.ensure(&version) {
        Ok(outcome) => {
            println!("\nReady!");
            println!("  Tool:    {}", outcome.tool);
            println!("  Version: {}", outcome.version);
            println!("  Bin:     {}", outcome.bin_dir.display());
            println!("  Cached:  {}", outcome.cache_hit);
        }
        Err(e) => {
            eprintln!("\nProvisioning failed: {}", e);
            if e.is_retryable() {
                eprintln!("  This looks transient; try again.");
            }
            std::process::exit(1);
        }
    }
}
