//! External feed boundary: score, odds, and pick-sheet feeds.
//!
//! Transport and parsing live here so the reconciliation core only ever sees
//! validated domain shapes. Feed failures are soft by contract: callers log
//! [`FeedError::Unavailable`] and proceed with whatever data they have.

mod client;
mod odds;
mod score;
mod sheet;

pub use client::{BackoffPolicy, FeedClient, FeedClientConfig, TokenBucket};
pub use odds::{OddsApiFeed, OddsFeed, SpreadLine};
pub use score::{ScoreFeed, ScoreboardFeed};
pub use sheet::{parse_pick_sheet, SheetFeed, SheetValuesFeed};

use thiserror::Error;

pub const CRATE_NAME: &str = "pool-feeds";

#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure: timeouts, connection errors, non-success
    /// statuses after retries. Callers proceed with partial or empty data.
    #[error("feed unavailable ({url}): {reason}")]
    Unavailable { url: String, reason: String },
    /// The feed answered but the payload did not have the expected shape.
    #[error("malformed feed payload ({url}): {reason}")]
    Malformed { url: String, reason: String },
}
