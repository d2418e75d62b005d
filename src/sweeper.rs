//! Background retention sweeper.
//!
//! Two passes per cycle.  The expiry pass tombstones expired records
//! and deletes their blobs.  The orphan pass handles blobs no record
//! references: on first sight they are tagged with a pending-deletion
//! prefix, and tagged blobs older than the grace period are deleted.
//! A failure on one item is logged and the sweep moves on.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::metrics::{
    SWEEPER_EXPIRED_TOTAL, SWEEPER_ORPHANS_DELETED_TOTAL, SWEEPER_RUNS_TOTAL,
};

use crate::storage::backend::BlobStore;
use crate::store::records::FileStore;

/// Prefix marking a blob as awaiting orphan deletion.  Storage keys
/// are hex, so the prefix can never collide with a live key.
pub const PENDING_DELETE_PREFIX: &str = "pending-delete-";

/// Counters from one sweep cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Expired records tombstoned.
    pub expired_swept: usize,
    /// Orphan blobs newly tagged for deletion.
    pub orphans_tagged: usize,
    /// Tagged orphan blobs deleted after the grace period.
    pub orphans_deleted: usize,
}

/// Run one sweep cycle.
///
/// `grace` is how long a tagged orphan must sit untouched before it is
/// deleted, measured against the blob's last-modified time.
pub async fn run_sweep(
    store: &Arc<dyn FileStore>,
    storage: &Arc<dyn BlobStore>,
    grace: Duration,
) -> anyhow::Result<SweepStats> {
    let mut stats = SweepStats::default();

    // Expiry pass.
    for record in store.expired_files(Utc::now()).await? {
        if let Err(err) = storage.delete(&record.storage_key).await {
            warn!(file_id = %record.id, error = %err, "failed to delete expired blob");
            continue;
        }
        match store.tombstone_file(&record.id).await {
            Ok(()) => {
                debug!(file_id = %record.id, "swept expired file");
                stats.expired_swept += 1;
            }
            Err(err) => {
                warn!(file_id = %record.id, error = %err, "failed to tombstone expired file");
            }
        }
    }

    // Orphan pass.
    let referenced: std::collections::HashSet<String> =
        store.storage_keys().await?.into_iter().collect();
    let now = SystemTime::now();

    for entry in storage.list().await? {
        if entry.key.starts_with(PENDING_DELETE_PREFIX) {
            let age = now
                .duration_since(entry.modified)
                .unwrap_or(Duration::ZERO);
            if age >= grace {
                match storage.delete(&entry.key).await {
                    Ok(()) => stats.orphans_deleted += 1,
                    Err(err) => {
                        warn!(key = %entry.key, error = %err, "failed to delete tagged orphan")
                    }
                }
            }
            continue;
        }

        if referenced.contains(&entry.key) {
            continue;
        }

        // First sighting of an orphan: tag it.  Deletion waits for a
        // later cycle once the grace period has passed.
        let tagged = format!("{PENDING_DELETE_PREFIX}{}", entry.key);
        match storage.rename(&entry.key, &tagged).await {
            Ok(()) => {
                debug!(key = %entry.key, "tagged orphan blob for deletion");
                stats.orphans_tagged += 1;
            }
            Err(err) => warn!(key = %entry.key, error = %err, "failed to tag orphan blob"),
        }
    }

    Ok(stats)
}

/// Spawn the periodic sweeper task.  The first sweep runs immediately.
pub fn spawn(
    store: Arc<dyn FileStore>,
    storage: Arc<dyn BlobStore>,
    interval_seconds: u64,
    orphan_grace_hours: u64,
) -> tokio::task::JoinHandle<()> {
    let grace = Duration::from_secs(orphan_grace_hours * 3600);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            ticker.tick().await;
            match run_sweep(&store, &storage, grace).await {
                Ok(stats) => {
                    counter!(SWEEPER_RUNS_TOTAL).increment(1);
                    counter!(SWEEPER_EXPIRED_TOTAL).increment(stats.expired_swept as u64);
                    counter!(SWEEPER_ORPHANS_DELETED_TOTAL)
                        .increment(stats.orphans_deleted as u64);
                    if stats != SweepStats::default() {
                        info!(
                            expired = stats.expired_swept,
                            tagged = stats.orphans_tagged,
                            deleted = stats.orphans_deleted,
                            "sweep cycle complete"
                        );
                    }
                }
                Err(err) => warn!(error = %err, "sweep cycle failed"),
            }
        }
    })
}
