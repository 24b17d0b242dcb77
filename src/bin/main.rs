//! trade-ops — process entry point.
//!
//! `serve` boots the dispatch surface and, when upstream credentials are
//! configured, kicks off the two-phase bootstrap harvest in the background so
//! the first signals appear without an operator in the loop.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use trade_intel_ops::api::{create_router, AppState, SharedState};
use trade_intel_ops::config::Config;
use trade_intel_ops::domain::HarvestSummary;
use trade_intel_ops::observability;
use trade_intel_ops::reference::harvest_jobs;

#[derive(Parser)]
#[command(name = "trade-ops", version, about = "Commodity trade-intelligence engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server (default)
    Serve {
        /// Skip the bootstrap harvest even when credentials are configured
        #[arg(long)]
        skip_bootstrap: bool,
    },
    /// Run harvest jobs once and print the summaries
    Harvest {
        /// A single job by name; omit to run the catalog
        #[arg(long)]
        job: Option<String>,
        /// Keep only jobs at or above this priority (1 is highest)
        #[arg(long)]
        priority: Option<u8>,
    },
    /// List the configured harvest jobs
    Jobs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    observability::init_tracing(&config.log_level, config.log_json);

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve {
        skip_bootstrap: false,
    }) {
        Command::Serve { skip_bootstrap } => serve(config, skip_bootstrap).await,
        Command::Harvest { job, priority } => harvest(config, job, priority).await,
        Command::Jobs => {
            println!("{}", serde_json::to_string_pretty(harvest_jobs())?);
            Ok(())
        }
    }
}

async fn serve(config: Config, skip_bootstrap: bool) -> Result<()> {
    let bind = format!("{}:{}", config.bind_addr, config.port);
    let state = AppState::build(config).context("failed to build application state")?;

    if skip_bootstrap {
        info!("Bootstrap harvest disabled by flag");
    } else if state.config.require_credentials().is_ok() {
        let bootstrap_state = state.clone();
        tokio::spawn(async move {
            info!("Starting bootstrap harvest");
            let summaries = bootstrap_state.harvester.bootstrap().await;
            if let Err(e) = store_summaries(&bootstrap_state, summaries).await {
                error!(error = %e, "Bootstrap harvest storage failed");
            }
        });
    } else {
        warn!("Upstream credentials not configured; serving analytics over an empty store");
    }

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(addr = %bind, "Dispatch surface listening");

    axum::serve(listener, router)
        .await
        .context("server terminated")
}

async fn harvest(config: Config, job_name: Option<String>, priority: Option<u8>) -> Result<()> {
    config
        .require_credentials()
        .context("harvest requires upstream credentials")?;

    let state = AppState::build(config)?;

    let mut summaries = match job_name {
        Some(name) => {
            let job = harvest_jobs()
                .iter()
                .find(|j| j.name == name)
                .with_context(|| format!("no harvest job named '{name}'"))?;
            vec![state.harvester.run_job(job).await]
        }
        None => state.harvester.run_all_jobs(priority).await,
    };

    store_summaries(&state, std::mem::take(&mut summaries)).await?;
    Ok(())
}

/// Move each summary's records into the store and log the outcome.
async fn store_summaries(state: &SharedState, summaries: Vec<HarvestSummary>) -> Result<()> {
    for mut summary in summaries {
        let records = summary.drain_records();
        let mut stored = 0usize;
        for record in records {
            if let Some(hct_id) = record.hct_id.clone() {
                stored += state.store.append(&hct_id, vec![record]).await?;
            }
        }
        info!(
            job = %summary.job_name,
            status = ?summary.status,
            normalized = summary.normalized_count,
            stored,
            errors = summary.error_count,
            "Harvest summary"
        );
    }
    Ok(())
}
