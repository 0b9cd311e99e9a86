//! `toolprov ensure`: provision one tool from command-line arguments.

use crate::Context;
use crate::cli::EnsureArgs;
use crate::config::Source;
use crate::ui;
use anyhow::{Context as _, Result, bail};
use provisioner::Provisioner;
use provisioner::path::RecordingPath;
use provisioner::resolver::{GitHubReleaseResolver, TemplateResolver};

/// Everything needed to build a [`Provisioner`] for one tool.
#[derive(Debug, Clone)]
pub struct ToolSpec<'a> {
    pub name: &'a str,
    pub source: Source<'a>,
    pub bin: &'a str,
    pub tag_prefix: Option<&'a str>,
    pub auth_header: Option<String>,
    pub github_token: Option<String>,
}

impl ToolSpec<'_> {
    /// Build the provisioner. With `keep_path`, PATH and GITHUB_PATH are
    /// left untouched.
    pub fn provisioner(&self, keep_path: bool) -> Result<Provisioner> {
        let builder = Provisioner::builder(self.name).bin_subpath(self.bin);
        let builder = match self.source {
            Source::Url(template) => builder.resolver(
                TemplateResolver::new(template)
                    .with_context(|| format!("Invalid URL template for '{}'", self.name))?,
            ),
            Source::GitHub { repo, asset } => {
                let mut resolver = GitHubReleaseResolver::new(repo, asset)
                    .with_context(|| format!("Invalid GitHub source for '{}'", self.name))?;
                if let Some(prefix) = self.tag_prefix {
                    resolver = resolver.tag_prefix(prefix);
                }
                if let Some(token) = &self.github_token {
                    resolver = resolver.token(token);
                }
                builder.resolver(resolver)
            }
        };
        let builder = match &self.auth_header {
            Some(header) => builder.auth_header(header),
            None => builder,
        };
        let builder = if keep_path {
            builder.path_registry(RecordingPath::new())
        } else {
            builder
        };

        builder
            .build()
            .with_context(|| format!("Cannot provision '{}'", self.name))
    }
}

pub fn run(ctx: &Context, args: EnsureArgs) -> Result<()> {
    let source = match (&args.url, &args.github, &args.asset) {
        (Some(url), None, _) => Source::Url(url),
        (None, Some(repo), Some(asset)) => Source::GitHub { repo, asset },
        _ => bail!("Pass either --url, or --github with --asset"),
    };
    let spec = ToolSpec {
        name: &args.name,
        source,
        bin: &args.bin,
        tag_prefix: Some(&args.tag_prefix),
        auth_header: args.auth_header.clone(),
        github_token: args.github_token.clone(),
    };

    let provisioner = spec.provisioner(args.no_path)?;
    let outcome = match provisioner.ensure(&args.version) {
        Ok(outcome) => outcome,
        Err(e) => {
            if !ctx.quiet {
                ui::report(&e);
            }
            return Err(e)
                .with_context(|| format!("Failed to provision {} {}", args.name, args.version));
        }
    };

    if !ctx.quiet {
        if outcome.cache_hit {
            ui::success(&format!("{} {} (cached)", args.name, outcome.version));
        } else {
            ui::success(&format!("{} {} installed", args.name, outcome.version));
        }
        ui::kv("Tool root", &outcome.tool_root.display().to_string());
        if args.no_path {
            ui::kv("Bin (not added)", &outcome.bin_dir.display().to_string());
        } else {
            ui::kv("Added to PATH", &outcome.bin_dir.display().to_string());
        }
    }

    Ok(())
}
