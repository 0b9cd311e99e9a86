use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "toolprov")]
#[command(version)]
#[command(about = "Provision pinned tool versions into the tool cache and onto PATH", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make one tool version available, downloading it on a cache miss
    Ensure(EnsureArgs),

    /// Ensure every tool declared in the config file
    Apply(ApplyArgs),

    /// Print the cached path of a tool version
    Find {
        /// Tool name
        name: String,
        /// Version (normalized before lookup)
        #[arg(id = "version_arg", value_name = "VERSION")]
        version: String,
    },

    /// List cached versions of a tool
    List {
        /// Tool name
        name: String,
    },

    /// Print a version normalized to three components
    Normalize {
        /// Version to normalize (e.g. "1.2")
        #[arg(id = "version_arg", value_name = "VERSION")]
        version: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct EnsureArgs {
    /// Tool name (cache namespace)
    pub name: String,

    /// Version to provision (e.g. "1.2" is cached as 1.2.0)
    #[arg(id = "version_arg", value_name = "VERSION")]
    pub version: String,

    /// Download URL template (e.g. https://example.com/tool-{version}-{os}.{ext})
    #[arg(long, conflicts_with = "github", required_unless_present = "github")]
    pub url: Option<String>,

    /// GitHub repository to take the release asset from (owner/repo)
    #[arg(long, requires = "asset")]
    pub github: Option<String>,

    /// Release asset name template, used with --github
    #[arg(long, requires = "github")]
    pub asset: Option<String>,

    /// Directory inside the extracted archive to add to PATH
    #[arg(long, default_value = ".")]
    pub bin: String,

    /// Authorization header value sent with the download
    #[arg(long, env = "TOOLPROV_AUTH_HEADER", hide_env_values = true)]
    pub auth_header: Option<String>,

    /// Prefix joining the version into a release tag, used with --github
    #[arg(long, default_value = "v")]
    pub tag_prefix: String,

    /// GitHub token for the releases API, used with --github
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Do not modify PATH or GITHUB_PATH
    #[arg(long)]
    pub no_path: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply these tools (default: all enabled tools)
    pub tools: Vec<String>,

    /// Show what would be acquired without downloading
    #[arg(long)]
    pub dry_run: bool,
}
