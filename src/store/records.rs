//! Record types and the abstract [`FileStore`] trait.
//!
//! The trait uses manual desugaring with pinned futures so it can be
//! shared as `Arc<dyn FileStore>` between request handlers and the
//! retention sweeper.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Generate an unguessable 16-hex-character file id (8 random bytes).
pub fn generate_file_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes)
}

/// Generate an unguessable 32-hex-character storage key (16 random bytes).
///
/// The key is independent of the display name so user-supplied filenames
/// never reach the filesystem.
pub fn generate_storage_key() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Metadata record for one uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Opaque unique identifier.
    pub id: String,
    /// Owning user; `None` means anonymous-owned.
    pub owner_id: Option<i64>,
    /// Opaque reference to the underlying blob.
    pub storage_key: String,
    /// Original filename shown to users.
    pub display_name: String,
    /// When true, only the owner or an admin may view/download.
    pub is_private: bool,
    /// Shared secret gating access, if any.
    pub password: Option<String>,
    /// Expiry timestamp; `None` = never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Cap on successful downloads, if any.
    pub access_limit: Option<u32>,
    /// Successful download count, starts at 0.
    pub downloads: u32,
    /// Blob size in bytes.
    pub size: u64,
    /// Immutable creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Whether the record has passed its expiry and is inert for
    /// download purposes, swept or not.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// Partial update applied by the edit operation.  Absent fields keep
/// their current values.
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    pub password: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_limit: Option<u32>,
    pub is_private: Option<bool>,
}

/// Outcome of a delete attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record row was removed.
    Deleted,
    /// Dependent access-log rows blocked the delete; the record was
    /// tombstoned instead (owner cleared, private, expiry cleared).
    Tombstoned,
}

/// One audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

/// One file-access log row.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub file_id: String,
    pub ip_address: String,
    pub access_type: String,
    pub accessed_at: DateTime<Utc>,
}

/// Async record store contract.
pub trait FileStore: Send + Sync + 'static {
    // ── File records ────────────────────────────────────────────────

    /// Insert a new file record.
    fn insert_file(
        &self,
        record: FileRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Get a file record by id.
    fn get_file(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<FileRecord>>> + Send + '_>>;

    /// List files owned by a user, newest first.
    fn files_by_owner(
        &self,
        owner_id: i64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<FileRecord>>> + Send + '_>>;

    /// Apply a partial update to a record's access options.
    fn update_file(
        &self,
        id: &str,
        update: FileUpdate,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<FileRecord>>> + Send + '_>>;

    /// Record one successful download as a single transaction: append an
    /// access-log row and increment `downloads`, but only while the
    /// count is still below `access_limit`.  Returns `false` when the
    /// conditional increment lost the race (quota already exhausted),
    /// in which case no access-log row is written either.
    fn record_download(
        &self,
        id: &str,
        user_id: Option<i64>,
        ip_address: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>>;

    /// Delete a record, falling back to a tombstone when dependent
    /// access-log rows hold a foreign key on it.
    fn delete_file(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<DeleteOutcome>> + Send + '_>>;

    /// Tombstone a record: owner cleared, private, expiry cleared.
    fn tombstone_file(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Records whose expiry has passed as of `now`.
    fn expired_files(
        &self,
        now: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<FileRecord>>> + Send + '_>>;

    /// Every storage key referenced by a record, tombstoned or not.
    fn storage_keys(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>>;

    // ── Settings ────────────────────────────────────────────────────

    /// Fetch the whole settings table as a key/value map.
    fn get_settings(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<HashMap<String, String>>> + Send + '_>>;

    /// Insert or update one setting.
    fn put_setting(
        &self,
        key: &str,
        value: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    // ── Audit log ───────────────────────────────────────────────────

    /// Append one audit event.
    fn append_audit(
        &self,
        user_id: Option<i64>,
        action: &str,
        details: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Audit events, newest first.
    fn list_audit(
        &self,
        limit: u32,
        offset: u32,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<AuditEntry>>> + Send + '_>>;

    // ── Access log ──────────────────────────────────────────────────

    /// File-access rows, newest first.
    fn list_access_logs(
        &self,
        limit: u32,
        offset: u32,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<AccessLogEntry>>> + Send + '_>>;

    /// Append one access-log row outside the download path (used by
    /// tests to simulate pre-existing history).
    fn append_access_log(
        &self,
        file_id: &str,
        user_id: Option<i64>,
        ip_address: &str,
        access_type: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}
