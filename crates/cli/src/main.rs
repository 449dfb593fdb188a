//! Wise statements downloader.
//!
//! Downloads the PDF balance statements of every selected profile for an
//! interval and writes them into a directory.

mod cancel;
mod config;
mod output;
mod signal;
mod statements;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use wise::{Client, Environment, StatementType, WiseApi};

use crate::cancel::Cancellation;
use crate::output::{FileSink, StdoutReporter};
use crate::statements::{ProfileSelection, StatementDownloader, StatementJob};

/// Download Wise balance statements as PDF.
#[derive(Parser, Debug)]
#[command(name = "wise-statements")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API token. Prefix with '@' to read it from a file.
    #[arg(long, env = "WISE_TOKEN", hide_env_values = true)]
    token: String,

    /// PEM-encoded RSA private key used for strong customer authentication.
    #[arg(long, env = "WISE_SCA_KEY")]
    key: PathBuf,

    /// Start of the statement interval (RFC 3339). Defaults to the beginning of the month.
    #[arg(long, value_parser = config::parse_timestamp)]
    start: Option<DateTime<Utc>>,

    /// End of the statement interval (RFC 3339). Defaults to now.
    #[arg(long, value_parser = config::parse_timestamp)]
    end: Option<DateTime<Utc>>,

    /// Get statements of personal profiles.
    #[arg(long)]
    personal: bool,

    /// Get statements of business profiles.
    #[arg(long)]
    business: bool,

    /// Statement layout.
    #[arg(long, value_enum, default_value = "compact")]
    statement_type: StatementTypeArg,

    /// Directory the statements are written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Use the sandbox API.
    #[arg(long)]
    sandbox: bool,

    /// Name the statements without downloading them.
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatementTypeArg {
    Compact,
    Flat,
}

impl From<StatementTypeArg> for StatementType {
    fn from(arg: StatementTypeArg) -> Self {
        match arg {
            StatementTypeArg::Compact => StatementType::Compact,
            StatementTypeArg::Flat => StatementType::Flat,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    info!("Starting wise-statements");

    // Credentials and interval are settled before any remote call.
    debug!("Loading token");
    let token = config::load_token(&cli.token)?;
    debug!(path = %cli.key.display(), "Loading private key");
    let key = config::load_private_key(&cli.key)?;

    let (interval_start, interval_end) =
        config::resolve_interval(cli.start, cli.end, Utc::now())?;
    debug!(%interval_start, %interval_end, "Statement interval");

    let selection = ProfileSelection {
        personal: cli.personal,
        business: cli.business,
    };
    if !selection.personal && !selection.business {
        warn!("Neither --personal nor --business given, no statements will be downloaded");
    }

    let environment = if cli.sandbox {
        Environment::Sandbox
    } else {
        Environment::Production
    };
    let api: Arc<dyn WiseApi> = Arc::new(
        Client::with_personal_token(environment, &token, key)
            .context("Failed to create API client")?,
    );

    let cancel = Cancellation::new();
    tokio::spawn(signal::trip_on_interrupt(cancel.clone()));

    let job = StatementJob {
        selection,
        interval_start,
        interval_end,
        statement_type: cli.statement_type.into(),
        dry_run: cli.dry_run,
    };
    let downloader = StatementDownloader::new(
        api,
        Arc::new(FileSink::new(cli.output_dir)),
        Arc::new(StdoutReporter),
        cancel,
    );

    let summary = downloader.run(&job).await?;
    info!(
        profiles = summary.profiles,
        statements = summary.planned.len(),
        written = summary.written.len(),
        "Done"
    );

    Ok(())
}
