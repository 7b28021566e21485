//! agquota - Aggregate Antigravity API quota status across accounts

use agquota::{
    aggregation::{aggregate_outcomes, fetch_all_accounts},
    cli::Cli,
    data_loader::{ensure_bootstrap_artifacts, load_accounts_config},
    error::{AgquotaError, Result},
    output::render_report,
    quota_fetcher::QuotaClient,
};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("agquota=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if !cli.no_bootstrap {
        // Discoverability only; a failure here never blocks the report.
        if let Err(error) = ensure_bootstrap_artifacts() {
            warn!("failed to create command file: {error}");
        }
    }

    let config = match load_accounts_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(AgquotaError::ConfigNotFound { path }) => {
            println!(
                "❌ Error: Configuration file not found at {}.\n\n\
                 Please ensure you have installed and configured 'opencode-antigravity-auth'. \
                 This tool relies on it for account credentials.",
                path.display()
            );
            std::process::exit(1);
        }
        Err(error) => return Err(error),
    };

    info!("checking quota for {} accounts", config.accounts.len());
    let client = QuotaClient::new();
    let outcomes = fetch_all_accounts(&client, &config.accounts).await;
    let aggregated = aggregate_outcomes(&outcomes);

    println!("{}", render_report(&aggregated, &config, Utc::now()));
    Ok(())
}
