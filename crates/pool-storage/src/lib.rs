//! Pool state storage and job coordination.
//!
//! [`PoolStore`] is a snapshot-transactional store over games, picks, pick
//! results, players, and job audit rows: a job begins a transaction, works on
//! a private copy of the state, and either commits it atomically or drops it
//! to roll everything back. [`LockCoordinator`] is the named mutual-exclusion
//! primitive that serializes the two scheduled jobs writing to it.

mod lock;
mod store;

pub use lock::{LockCoordinator, LockError, LockGuard, RECONCILE_LOCK_ID};
pub use store::{PoolStore, StoreTxn};

use thiserror::Error;

pub const CRATE_NAME: &str = "pool-storage";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("unknown game {0}")]
    UnknownGame(String),
    #[error("unknown pick {0:?}")]
    UnknownPick(pool_core::PickId),
}
