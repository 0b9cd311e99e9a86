//! `toolprov apply`: provision every tool declared in the config file.

use crate::Context;
use crate::cli::ApplyArgs;
use crate::commands::ensure::ToolSpec;
use crate::config::{Config, ToolEntry};
use crate::ui;
use anyhow::{Result, bail};
use std::collections::HashSet;

const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    apply(ctx, &config, &args.tools, args.dry_run)
}

fn apply(ctx: &Context, config: &Config, filter: &[String], dry_run: bool) -> Result<()> {
    let selected = select(config, filter);

    if selected.is_empty() {
        if filter.is_empty() {
            ui::info("No tools defined in config. Add tools to the [tools] section.");
        } else {
            ui::warn("No matching tools found in config.");
        }
        return Ok(());
    }
    for name in filter {
        if !selected.iter().any(|(n, _)| *n == name) {
            ui::warn(&format!("{} is not an enabled tool in the config", name));
        }
    }

    if !ctx.quiet {
        ui::header(if dry_run { "Planned Tools" } else { "Applying Tools" });
    }

    let github_token = std::env::var(GITHUB_TOKEN).ok().filter(|t| !t.is_empty());
    let mut installed = 0;
    let mut cached = 0;
    let mut failed = 0;

    for (name, entry) in selected {
        let result = spec_for(name, entry, github_token.clone())
            .and_then(|spec| spec.provisioner(dry_run));
        let provisioner = match result {
            Ok(provisioner) => provisioner,
            Err(e) => {
                ui::error(&format!("  {} failed: {:#}", name, e));
                failed += 1;
                continue;
            }
        };

        if dry_run {
            match provisioner.find(&entry.version) {
                Some(path) => {
                    ui::dim(&format!("✓ {} {} (cached at {})", name, entry.version, path.display()));
                    cached += 1;
                }
                None => {
                    ui::info(&format!("  Would acquire: {} {}", name, entry.version));
                    installed += 1;
                }
            }
            continue;
        }

        match provisioner.ensure(&entry.version) {
            Ok(outcome) if outcome.cache_hit => {
                if !ctx.quiet {
                    ui::dim(&format!("✓ {} {} (cached)", name, outcome.version));
                }
                cached += 1;
            }
            Ok(outcome) => {
                if !ctx.quiet {
                    ui::success(&format!("  {} {} installed", name, outcome.version));
                }
                installed += 1;
            }
            Err(e) => {
                ui::report(&e);
                failed += 1;
            }
        }
    }

    if !ctx.quiet {
        println!();
        ui::header("Summary");
        ui::kv(if dry_run { "To acquire" } else { "Installed" }, &installed.to_string());
        ui::kv("Cached", &cached.to_string());
        if failed > 0 {
            ui::kv("Failed", &failed.to_string());
        }
    }

    if failed > 0 {
        bail!("{} tool(s) failed to provision", failed);
    }

    Ok(())
}

/// Enabled tools, narrowed to `filter` when it is not empty.
fn select<'a>(config: &'a Config, filter: &[String]) -> Vec<(&'a String, &'a ToolEntry)> {
    if filter.is_empty() {
        return config.enabled_tools().collect();
    }
    let wanted: HashSet<&str> = filter.iter().map(String::as_str).collect();
    config
        .enabled_tools()
        .filter(|(name, _)| wanted.contains(name.as_str()))
        .collect()
}

fn spec_for<'a>(
    name: &'a str,
    entry: &'a ToolEntry,
    github_token: Option<String>,
) -> Result<ToolSpec<'a>> {
    Ok(ToolSpec {
        name,
        source: entry.source()?,
        bin: entry.bin.as_deref().unwrap_or("."),
        tag_prefix: entry.tag_prefix.as_deref(),
        auth_header: entry.auth_header()?,
        github_token,
    })
}
