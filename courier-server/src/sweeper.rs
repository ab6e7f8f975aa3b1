//! Expiration sweeper
//!
//! A background task that deletes the blob and then the record of every
//! expired transfer. Runs once at start and then on a fixed interval,
//! independently of request handling.

use std::time::Duration;

use courier_common::time::SECONDS_PER_HOUR;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::constants::MAX_SWEEP_INTERVAL_HOURS;
use crate::db::TransferDb;
use crate::errors::PersistenceError;
use crate::files::StorageArea;

/// Interval for a configured number of hours, clamped to 1..=12
#[must_use]
pub fn sweep_interval(hours: u64) -> Duration {
    Duration::from_secs(hours.clamp(1, MAX_SWEEP_INTERVAL_HOURS) * SECONDS_PER_HOUR)
}

/// Outcome of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired records found
    pub expired: usize,
    /// Records whose blob and record are both gone
    pub swept: usize,
    /// Blobs that were still on disk and got deleted
    pub blobs_removed: usize,
    /// Records left for the next pass
    pub failed: usize,
}

/// Deletes expired transfers
#[derive(Clone)]
pub struct Sweeper {
    db: TransferDb,
    storage: StorageArea,
}

impl Sweeper {
    pub fn new(db: TransferDb, storage: StorageArea) -> Self {
        Self { db, storage }
    }

    /// One pass over all transfers expired before `now`
    ///
    /// A record is deleted only after its blob is gone, so an interrupted
    /// pass is finished by the next one.
    pub async fn run_once(&self, now: i64) -> Result<SweepReport, PersistenceError> {
        let expired = self.db.list_expired(now).await?;
        let mut report = SweepReport {
            expired: expired.len(),
            ..SweepReport::default()
        };

        for record in expired {
            match self.storage.remove_blob(&record.id).await {
                Ok(true) => report.blobs_removed += 1,
                Ok(false) => debug!(transfer_id = %record.id, "blob already gone"),
                Err(e) => {
                    warn!(transfer_id = %record.id, error = %e, "failed to delete expired blob");
                    report.failed += 1;
                    continue;
                }
            }

            match self.db.delete(&record.id, now).await {
                Ok(_) => {
                    debug!(transfer_id = %record.id, expires_at = record.expires_at, "transfer swept");
                    report.swept += 1;
                }
                Err(e) => {
                    warn!(transfer_id = %record.id, error = %e, "failed to delete expired record");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run the sweeper in its own task until `shutdown` flips or its sender drops
    pub fn spawn(self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    // The first tick completes immediately
                    _ = ticker.tick() => {
                        let now = chrono::Utc::now().timestamp();
                        match self.run_once(now).await {
                            Ok(report) if report.expired > 0 => info!(
                                expired = report.expired,
                                swept = report.swept,
                                blobs_removed = report.blobs_removed,
                                failed = report.failed,
                                "sweep finished"
                            ),
                            Ok(_) => debug!("sweep found nothing to do"),
                            Err(e) => error!(error = %e, "sweep failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("sweeper stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}
