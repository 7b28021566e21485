//! agquota - Aggregate Antigravity API quota status across accounts
//!
//! This library provides functionality to:
//! - Read the credential store written by `opencode-antigravity-auth`
//! - Refresh each account's OAuth access token and resolve its quota project
//! - Fetch and normalize per-model quota data from the cloudcode API
//! - Merge per-account results into a signature-grouped Markdown report,
//!   blended with the locally cached rate-limit ledger
//!
//! # Examples
//!
//! ```no_run
//! use agquota::{
//!     aggregation::{aggregate_outcomes, fetch_all_accounts},
//!     data_loader::load_accounts_config,
//!     output::render_report,
//!     quota_fetcher::QuotaClient,
//! };
//! use chrono::Utc;
//!
//! #[tokio::main]
//! async fn main() -> agquota::Result<()> {
//!     let config = load_accounts_config(None)?;
//!     let client = QuotaClient::new();
//!
//!     let outcomes = fetch_all_accounts(&client, &config.accounts).await;
//!     let aggregated = aggregate_outcomes(&outcomes);
//!     println!("{}", render_report(&aggregated, &config, Utc::now()));
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod cli;
pub mod data_loader;
pub mod error;
pub mod format;
pub mod output;
pub mod quota_fetcher;
pub mod types;

// Re-export commonly used types
pub use error::{AgquotaError, Result};
pub use types::{Account, AccountOutcome, AccountsConfig, ModelQuota};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
