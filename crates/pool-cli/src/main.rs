use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pool_sync::JobOutcome;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pool-cli")]
#[command(about = "Survivor pool reconciliation jobs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch scores and run one reconciliation pass.
    ScoreUpdate {
        /// Also pull point spreads for the current week.
        #[arg(long)]
        fetch_odds: bool,
    },
    /// Rebuild players and picks from the sheet, then reconcile.
    SheetResync,
    /// Join point spreads onto the current week's stored games.
    OddsUpdate,
    /// Run the cron scheduler until interrupted.
    Schedule,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let orchestrator = Arc::new(pool_sync::build_from_env()?);

    let (job_name, outcome) = match cli
        .command
        .unwrap_or(Commands::ScoreUpdate { fetch_odds: false })
    {
        Commands::ScoreUpdate { fetch_odds } => (
            pool_sync::JOB_UPDATE_SCORES,
            orchestrator.run_score_update(fetch_odds).await,
        ),
        Commands::SheetResync => (
            pool_sync::JOB_SHEET_RESYNC,
            orchestrator.run_sheet_resync().await,
        ),
        Commands::OddsUpdate => (
            pool_sync::JOB_UPDATE_ODDS,
            orchestrator.run_odds_update().await,
        ),
        Commands::Schedule => {
            let Some(mut scheduler) = orchestrator.maybe_build_scheduler().await? else {
                bail!("scheduler disabled; set POOL_SCHEDULER_ENABLED=1");
            };
            scheduler.start().await.context("starting scheduler")?;
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    if let Some(record) = orchestrator.store().job_run(job_name) {
        println!(
            "{}: {} ({})",
            record.job_name,
            record.status.as_str(),
            record.message
        );
    }

    // A skipped run is the lock doing its job, not a failure.
    Ok(match outcome {
        JobOutcome::Success | JobOutcome::Skipped => ExitCode::SUCCESS,
        JobOutcome::Error => ExitCode::FAILURE,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
