//! Schema store trait definition
//!
//! A [`SchemaStore`] hides the persistence engine behind the operations the
//! migrator needs: bookkeeping tables, the cross-process migration lock, the
//! applied-version ledger, and schema snapshots.

use crate::error::{StoreError, StoreResult};
use crate::traits::Database;
use async_trait::async_trait;
use std::future::Future;
use std::io::{Read, Write};
use std::time::Duration;
use tokio::sync::watch;

/// Outcome of a single lock insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAttempt {
    /// The lock row was inserted by this caller
    Acquired,
    /// The lock row already exists
    Contended,
}

/// Bounds for [`SchemaStore::acquire_lock`]
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Give up after this long
    pub timeout: Duration,

    /// Delay between attempts
    pub poll_interval: Duration,

    /// Set to `true` to abandon the wait early
    pub cancel: Option<watch::Receiver<bool>>,
}

impl LockOptions {
    /// Options with the given deadline and poll interval and no cancel signal
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            cancel: None,
        }
    }

    /// Attach a cancellation signal
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

impl Default for LockOptions {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(1))
    }
}

/// Persistence operations required by the migrator
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Connection handle handed to migration units
    fn database(&self) -> &dyn Database;

    /// Create the lock and ledger tables if absent. Safe to call on every run.
    async fn initialize(&self) -> StoreResult<()>;

    /// Make one attempt to insert the lock row.
    ///
    /// Contention must be reported as [`LockAttempt::Contended`]; every
    /// other failure is an error.
    async fn try_acquire_lock(&self) -> StoreResult<LockAttempt>;

    /// Delete the lock row
    async fn release_lock(&self) -> StoreResult<()>;

    /// Whether the lock row currently exists
    async fn lock_held(&self) -> StoreResult<bool>;

    /// Applied version ids in insertion order, validated strictly increasing
    async fn applied_versions(&self) -> StoreResult<Vec<u64>>;

    /// Record `id` as applied, in its own transaction
    async fn record_applied(&self, id: u64) -> StoreResult<()>;

    /// Erase the ledger entry for `id`, in its own transaction
    async fn record_reverted(&self, id: u64) -> StoreResult<()>;

    /// Write the canonical DDL of the live schema to `sink`
    async fn dump_schema(&self, sink: &mut (dyn Write + Send)) -> StoreResult<()>;

    /// Execute a DDL text read from `source`
    async fn load_schema(&self, source: &mut (dyn Read + Send)) -> StoreResult<()>;

    /// Release the underlying connection. Idempotent.
    async fn close(&self) -> StoreResult<()>;

    /// Poll [`try_acquire_lock`](SchemaStore::try_acquire_lock) until the
    /// lock is obtained, the timeout elapses, or the cancel signal fires.
    async fn acquire_lock(&self, options: &LockOptions) -> StoreResult<()> {
        wait_for(options, move || async move {
            match self.try_acquire_lock().await? {
                LockAttempt::Acquired => {
                    log::info!("obtained schema write lock");
                    Ok(Some(()))
                }
                LockAttempt::Contended => {
                    log::info!(
                        "schema locked for writing, retrying in {:?}",
                        options.poll_interval
                    );
                    Ok(None)
                }
            }
        })
        .await
    }
}

/// Repeat `attempt` every poll interval until it yields a value.
///
/// `Ok(None)` means contended; errors end the wait. The whole wait is
/// bounded by `options.timeout` and ends early when the cancel signal fires.
pub async fn wait_for<T, F, Fut>(options: &LockOptions, mut attempt: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<Option<T>>>,
{
    let mut cancel = options.cancel.clone();
    let poll = async {
        loop {
            if let Some(value) = attempt().await? {
                return Ok(value);
            }

            let sender_gone = match cancel.as_mut() {
                Some(rx) => {
                    if *rx.borrow() {
                        return Err(StoreError::LockCancelled);
                    }
                    let changed = tokio::select! {
                        _ = tokio::time::sleep(options.poll_interval) => None,
                        changed = rx.changed() => Some(changed.is_ok()),
                    };
                    match changed {
                        Some(true) if *rx.borrow() => return Err(StoreError::LockCancelled),
                        Some(false) => true,
                        _ => false,
                    }
                }
                None => {
                    tokio::time::sleep(options.poll_interval).await;
                    false
                }
            };
            // Nobody can cancel any more; keep polling until the deadline.
            if sender_gone {
                cancel = None;
            }
        }
    };

    match tokio::time::timeout(options.timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::LockTimeout {
            waited: options.timeout,
        }),
    }
}

/// Check the ledger invariant: strictly increasing, no duplicates.
pub fn validate_ledger(ids: &[u64]) -> StoreResult<()> {
    for pair in ids.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next == prev {
            return Err(StoreError::LedgerCorrupt(format!(
                "duplicate version record {next}"
            )));
        }
        if next < prev {
            return Err(StoreError::LedgerCorrupt(format!(
                "version order mismatch, {prev} precedes {next}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
