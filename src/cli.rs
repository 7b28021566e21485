//! CLI interface for agquota
//!
//! A single on-demand report, so there are no subcommands: `agquota`
//! prints the consolidated quota status for every configured account.
//!
//! # Example
//!
//! ```bash
//! # Report against the default credential store locations
//! agquota
//!
//! # Explicit store location, warnings only
//! agquota --config ~/.config/opencode/antigravity-accounts.json --quiet
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Aggregate Antigravity API quota status across all configured Google accounts
#[derive(Parser, Debug, Clone)]
#[command(name = "agquota")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the credential store (default: the opencode config/data directories)
    #[arg(long, short = 'c', env = "AGQUOTA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Skip creating the opencode command file on startup
    #[arg(long)]
    pub no_bootstrap: bool,
}
