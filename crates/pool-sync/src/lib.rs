//! Reconciliation jobs for the survivor pool.
//!
//! [`engine`] holds the pure reconciliation pass: link picks to games, lock
//! at kickoff, resolve survival, repair stalled games, auto-eliminate missed
//! submissions. [`resync`] rebuilds players and picks from the sheet.
//! [`Orchestrator`] wraps both in lock acquisition, audit rows, and the
//! optional cron scheduler.

mod engine;
mod orchestrator;
mod resync;

pub use engine::{run_full_pass, PassOutcome};
pub use orchestrator::{
    build_from_env, JobOutcome, Orchestrator, SyncConfig, JOB_SHEET_RESYNC, JOB_UPDATE_ODDS,
    JOB_UPDATE_SCORES,
};
pub use resync::{resync_picks, ResyncOutcome};

pub const CRATE_NAME: &str = "pool-sync";
