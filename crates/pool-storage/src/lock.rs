//! Named mutual-exclusion locks with bounded wait.
//!
//! Score updates and sheet resyncs both rewrite overlapping pick/result rows,
//! so they contend for one shared lock id and run strictly serialized. The
//! coordinator is an in-process keyed mutex; deployments backed by a store
//! with real advisory locks can swap this layer without touching callers.
//! The pass-through mode exists for single-writer dev setups and is weaker by
//! construction: it never blocks and never rejects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Shared lock id for every job that writes picks or pick results.
pub const RECONCILE_LOCK_ID: &str = "picks-reconcile";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {lock_id} busy after {waited:?}; another job is running")]
    Busy { lock_id: String, waited: Duration },
}

enum Mode {
    Keyed(Mutex<HashMap<String, Arc<Semaphore>>>),
    Passthrough,
}

pub struct LockCoordinator {
    mode: Mode,
}

impl LockCoordinator {
    pub fn new() -> Self {
        Self {
            mode: Mode::Keyed(Mutex::new(HashMap::new())),
        }
    }

    /// No-op coordinator for single-writer setups. Every acquire succeeds
    /// immediately; there is no mutual exclusion at all.
    pub fn passthrough() -> Self {
        Self {
            mode: Mode::Passthrough,
        }
    }

    /// Block up to `timeout` for the named lock. The returned guard releases
    /// the lock when dropped, on success and error paths alike.
    pub async fn acquire(&self, lock_id: &str, timeout: Duration) -> Result<LockGuard, LockError> {
        let semaphore = match &self.mode {
            Mode::Passthrough => {
                warn!(lock_id, "lock coordinator in pass-through mode; not serializing");
                return Ok(LockGuard {
                    lock_id: lock_id.to_string(),
                    _permit: None,
                });
            }
            Mode::Keyed(slots) => {
                let mut slots = slots.lock().await;
                slots
                    .entry(lock_id.to_string())
                    .or_insert_with(|| Arc::new(Semaphore::new(1)))
                    .clone()
            }
        };

        match tokio::time::timeout(timeout, semaphore.acquire_owned()).await {
            Ok(Ok(permit)) => {
                debug!(lock_id, "lock acquired");
                Ok(LockGuard {
                    lock_id: lock_id.to_string(),
                    _permit: Some(permit),
                })
            }
            // Semaphores are never closed; treat closure like contention.
            Ok(Err(_)) | Err(_) => Err(LockError::Busy {
                lock_id: lock_id.to_string(),
                waited: timeout,
            }),
        }
    }
}

impl Default for LockCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped lock ownership; dropping it releases the lock.
pub struct LockGuard {
    lock_id: String,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        debug!(lock_id = %self.lock_id, "lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let locks = LockCoordinator::new();
        let guard = locks
            .acquire(RECONCILE_LOCK_ID, Duration::from_millis(50))
            .await
            .expect("first acquire");

        let busy = locks
            .acquire(RECONCILE_LOCK_ID, Duration::from_millis(20))
            .await;
        assert!(matches!(busy, Err(LockError::Busy { .. })));

        drop(guard);
        locks
            .acquire(RECONCILE_LOCK_ID, Duration::from_millis(50))
            .await
            .expect("acquire after release");
    }

    #[tokio::test]
    async fn different_ids_do_not_contend() {
        let locks = LockCoordinator::new();
        let _a = locks
            .acquire("job-a", Duration::from_millis(20))
            .await
            .expect("lock a");
        let _b = locks
            .acquire("job-b", Duration::from_millis(20))
            .await
            .expect("lock b");
    }

    #[tokio::test]
    async fn passthrough_never_blocks() {
        let locks = LockCoordinator::passthrough();
        let _a = locks
            .acquire(RECONCILE_LOCK_ID, Duration::from_millis(1))
            .await
            .expect("passthrough acquire");
        let _b = locks
            .acquire(RECONCILE_LOCK_ID, Duration::from_millis(1))
            .await
            .expect("passthrough acquire while held");
    }
}
