//! SQLite-backed record store.
//!
//! Uses `rusqlite` with the `bundled` feature so no system SQLite
//! library is required.  All async trait methods are thin wrappers
//! around synchronous rusqlite calls executed under a `Mutex`.
//!
//! The database is the sole arbiter of consistency: the download
//! counter increment is a conditional single-row UPDATE inside a
//! transaction, and the access-log table holds a hard foreign key on
//! `files` so deletes with history fall back to tombstoning.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::records::{
    AccessLogEntry, AuditEntry, DeleteOutcome, FileRecord, FileStore, FileUpdate,
};

/// Current schema version.  Bumped when migrations are added.
const SCHEMA_VERSION: i64 = 1;

/// Settings seeded on every startup (idempotent).  Note the seeded
/// `maxFileSize` differs from the in-code fallback; see
/// `settings::UploadPolicy`.
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("maxFileSize", "5242880"),
    ("defaultExpirationHours", "24"),
    ("maxAnonymousFileSize", "1048576"),
    ("maxAnonymousFileExpirationHours", "24"),
];

/// Record store backed by a single SQLite database file.
pub struct SqliteFileStore {
    /// The database connection, guarded by a mutex for Send + Sync.
    conn: Mutex<Connection>,
}

impl SqliteFileStore {
    /// Open (or create) the database at `path` and initialize the schema.
    ///
    /// Passing `":memory:"` creates an in-memory database (useful for tests).
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.apply_pragmas()?;
        store.init_db()?;
        Ok(store)
    }

    /// Apply recommended SQLite pragmas for performance and safety.
    fn apply_pragmas(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Ok(())
    }

    /// Create the required tables and indexes if they do not already exist.
    /// Idempotent -- safe to call on every startup.
    fn init_db(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        conn.execute_batch(
            "
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version    INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );

            -- File records
            CREATE TABLE IF NOT EXISTS files (
                id           TEXT PRIMARY KEY,
                owner_id     INTEGER,
                storage_key  TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                is_private   INTEGER NOT NULL DEFAULT 0,
                password     TEXT,
                expires_at   TEXT,
                access_limit INTEGER,
                downloads    INTEGER NOT NULL DEFAULT 0,
                size         INTEGER NOT NULL,
                created_at   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_files_owner
                ON files(owner_id);
            CREATE INDEX IF NOT EXISTS idx_files_expires
                ON files(expires_at);

            -- System settings
            CREATE TABLE IF NOT EXISTS settings (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Audit trail
            CREATE TABLE IF NOT EXISTS audit_log (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER,
                action     TEXT NOT NULL,
                details    TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_created
                ON audit_log(created_at);

            -- File access log. The foreign key is deliberately not
            -- cascading: rows here block hard deletes of their file.
            CREATE TABLE IF NOT EXISTS file_access_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER,
                file_id     TEXT NOT NULL,
                ip_address  TEXT,
                access_type TEXT NOT NULL,
                accessed_at TEXT NOT NULL,

                FOREIGN KEY (file_id) REFERENCES files(id)
            );

            CREATE INDEX IF NOT EXISTS idx_access_file
                ON file_access_log(file_id);
            ",
        )?;

        // Record schema version if not already present.
        let existing: Option<i64> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();

        if existing.is_none() || existing.unwrap() < SCHEMA_VERSION {
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                params![SCHEMA_VERSION, fmt_ts(Utc::now())],
            )?;
        }

        Ok(())
    }

    /// Seed default settings on startup.  Existing values are never
    /// overwritten, so operator changes survive restarts.
    pub fn seed_settings(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        let now = fmt_ts(Utc::now());
        for (key, value) in DEFAULT_SETTINGS {
            conn.execute(
                "INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )?;
        }
        Ok(())
    }
}

/// Format a timestamp as RFC 3339 with millisecond precision in UTC.
/// The fixed width keeps string comparison consistent with time order.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC 3339 timestamp back into `DateTime<Utc>`.
fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Map a `SELECT <FILE_COLUMNS>` row to a [`FileRecord`].
fn map_file_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    let expires_at: Option<String> = row.get(6)?;
    let created_at: String = row.get(10)?;
    Ok(FileRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        storage_key: row.get(2)?,
        display_name: row.get(3)?,
        is_private: row.get(4)?,
        password: row.get(5)?,
        expires_at: expires_at
            .as_deref()
            .map(parse_ts)
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        access_limit: row.get::<_, Option<i64>>(7)?.map(|v| v as u32),
        downloads: row.get::<_, i64>(8)? as u32,
        size: row.get::<_, i64>(9)? as u64,
        created_at: parse_ts(&created_at).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                10,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
    })
}

/// Column list matching [`map_file_row`].
const FILE_COLUMNS: &str =
    "id, owner_id, storage_key, display_name, is_private, password, \
     expires_at, access_limit, downloads, size, created_at";

// ── FileStore implementation ───────────────────────────────────────

impl FileStore for SqliteFileStore {
    fn insert_file(
        &self,
        record: FileRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO files (id, owner_id, storage_key, display_name, is_private,
                                    password, expires_at, access_limit, downloads, size, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.owner_id,
                    record.storage_key,
                    record.display_name,
                    record.is_private,
                    record.password,
                    record.expires_at.map(fmt_ts),
                    record.access_limit.map(|v| v as i64),
                    record.downloads as i64,
                    record.size as i64,
                    fmt_ts(record.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn get_file(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<FileRecord>>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let record = conn
                .query_row(
                    &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
                    params![id],
                    map_file_row,
                )
                .optional()?;
            Ok(record)
        })
    }

    fn files_by_owner(
        &self,
        owner_id: i64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<FileRecord>>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare(&format!(
                "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ?1 ORDER BY created_at DESC"
            ))?;
            let records = stmt
                .query_map(params![owner_id], map_file_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    fn update_file(
        &self,
        id: &str,
        update: FileUpdate,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<FileRecord>>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "UPDATE files SET
                     password     = COALESCE(?2, password),
                     expires_at   = COALESCE(?3, expires_at),
                     access_limit = COALESCE(?4, access_limit),
                     is_private   = COALESCE(?5, is_private)
                 WHERE id = ?1",
                params![
                    id,
                    update.password,
                    update.expires_at.map(fmt_ts),
                    update.access_limit.map(|v| v as i64),
                    update.is_private,
                ],
            )?;
            let record = conn
                .query_row(
                    &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
                    params![id],
                    map_file_row,
                )
                .optional()?;
            Ok(record)
        })
    }

    fn record_download(
        &self,
        id: &str,
        user_id: Option<i64>,
        ip_address: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let id = id.to_string();
        let ip_address = ip_address.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let tx = conn.unchecked_transaction()?;

            // Conditional increment: two racing downloads against a
            // nearly-exhausted limit cannot both pass.
            let changed = tx.execute(
                "UPDATE files SET downloads = downloads + 1
                 WHERE id = ?1
                   AND (access_limit IS NULL OR downloads < access_limit)",
                params![id],
            )?;

            if changed == 0 {
                // Quota exhausted between authorization and serving;
                // the transaction rolls back on drop.
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO file_access_log (user_id, file_id, ip_address, access_type, accessed_at)
                 VALUES (?1, ?2, ?3, 'download', ?4)",
                params![user_id, id, ip_address, fmt_ts(Utc::now())],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    fn delete_file(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<DeleteOutcome>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");

            match conn.execute("DELETE FROM files WHERE id = ?1", params![id]) {
                Ok(_) => Ok(DeleteOutcome::Deleted),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    // Access-log rows reference this file: keep the row
                    // for history but strip it down to a tombstone.
                    conn.execute(
                        "UPDATE files SET owner_id = NULL, is_private = 1, expires_at = NULL
                         WHERE id = ?1",
                        params![id],
                    )?;
                    Ok(DeleteOutcome::Tombstoned)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn tombstone_file(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "UPDATE files SET owner_id = NULL, is_private = 1, expires_at = NULL
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
    }

    fn expired_files(
        &self,
        now: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<FileRecord>>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare(&format!(
                "SELECT {FILE_COLUMNS} FROM files
                 WHERE expires_at IS NOT NULL AND expires_at < ?1"
            ))?;
            let records = stmt
                .query_map(params![fmt_ts(now)], map_file_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    fn storage_keys(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare("SELECT storage_key FROM files")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }

    fn get_settings(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<HashMap<String, String>>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
            let map = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<HashMap<_, _>, _>>()?;
            Ok(map)
        })
    }

    fn put_setting(
        &self,
        key: &str,
        value: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        let value = value.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                               updated_at = excluded.updated_at",
                params![key, value, fmt_ts(Utc::now())],
            )?;
            Ok(())
        })
    }

    fn append_audit(
        &self,
        user_id: Option<i64>,
        action: &str,
        details: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let action = action.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO audit_log (user_id, action, details, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, action, details.to_string(), fmt_ts(Utc::now())],
            )?;
            Ok(())
        })
    }

    fn list_audit(
        &self,
        limit: u32,
        offset: u32,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<AuditEntry>>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare(
                "SELECT id, user_id, action, details, created_at FROM audit_log
                 ORDER BY id DESC LIMIT ?1 OFFSET ?2",
            )?;
            let entries = stmt
                .query_map(params![limit, offset], |row| {
                    let created_at: String = row.get(4)?;
                    Ok(AuditEntry {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        action: row.get(2)?,
                        details: row.get(3)?,
                        created_at: parse_ts(&created_at).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                4,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    fn list_access_logs(
        &self,
        limit: u32,
        offset: u32,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<AccessLogEntry>>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare(
                "SELECT id, user_id, file_id, ip_address, access_type, accessed_at
                 FROM file_access_log ORDER BY id DESC LIMIT ?1 OFFSET ?2",
            )?;
            let entries = stmt
                .query_map(params![limit, offset], |row| {
                    let accessed_at: String = row.get(5)?;
                    Ok(AccessLogEntry {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        file_id: row.get(2)?,
                        ip_address: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        access_type: row.get(4)?,
                        accessed_at: parse_ts(&accessed_at).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                5,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    fn append_access_log(
        &self,
        file_id: &str,
        user_id: Option<i64>,
        ip_address: &str,
        access_type: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let file_id = file_id.to_string();
        let ip_address = ip_address.to_string();
        let access_type = access_type.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO file_access_log (user_id, file_id, ip_address, access_type, accessed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, file_id, ip_address, access_type, fmt_ts(Utc::now())],
            )?;
            Ok(())
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::{generate_file_id, generate_storage_key};
    use chrono::Duration;
    use std::sync::Arc;

    fn test_store() -> SqliteFileStore {
        SqliteFileStore::new(":memory:").expect("failed to open in-memory store")
    }

    fn sample_record() -> FileRecord {
        FileRecord {
            id: generate_file_id(),
            owner_id: Some(1),
            storage_key: generate_storage_key(),
            display_name: "report.pdf".into(),
            is_private: false,
            password: None,
            expires_at: None,
            access_limit: None,
            downloads: 0,
            size: 1024,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let store = test_store();
        let record = sample_record();
        store.insert_file(record.clone()).await.unwrap();

        let got = store.get_file(&record.id).await.unwrap().unwrap();
        assert_eq!(got.id, record.id);
        assert_eq!(got.storage_key, record.storage_key);
        assert_eq!(got.display_name, "report.pdf");
        assert_eq!(got.downloads, 0);
        assert_eq!(got.size, 1024);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = test_store();
        assert!(store.get_file("deadbeef00000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiry_roundtrip_preserves_instant() {
        let store = test_store();
        let mut record = sample_record();
        let expiry = Utc::now() + Duration::hours(2);
        record.expires_at = Some(expiry);
        store.insert_file(record.clone()).await.unwrap();

        let got = store.get_file(&record.id).await.unwrap().unwrap();
        let stored = got.expires_at.unwrap();
        // Millisecond precision survives the round trip.
        assert_eq!(stored.timestamp_millis(), expiry.timestamp_millis());
    }

    #[tokio::test]
    async fn test_update_file_partial() {
        let store = test_store();
        let record = sample_record();
        store.insert_file(record.clone()).await.unwrap();

        let updated = store
            .update_file(
                &record.id,
                FileUpdate {
                    password: Some("s3cret".into()),
                    is_private: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.password.as_deref(), Some("s3cret"));
        assert!(updated.is_private);
        // Untouched fields survive.
        assert_eq!(updated.access_limit, None);
        assert_eq!(updated.display_name, "report.pdf");
    }

    #[tokio::test]
    async fn test_record_download_increments_and_logs() {
        let store = test_store();
        let record = sample_record();
        store.insert_file(record.clone()).await.unwrap();

        let ok = store
            .record_download(&record.id, Some(1), "127.0.0.1")
            .await
            .unwrap();
        assert!(ok);

        let got = store.get_file(&record.id).await.unwrap().unwrap();
        assert_eq!(got.downloads, 1);

        let logs = store.list_access_logs(10, 0).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].file_id, record.id);
        assert_eq!(logs[0].access_type, "download");
    }

    #[tokio::test]
    async fn test_record_download_respects_limit() {
        let store = test_store();
        let mut record = sample_record();
        record.access_limit = Some(1);
        store.insert_file(record.clone()).await.unwrap();

        assert!(store
            .record_download(&record.id, None, "10.0.0.1")
            .await
            .unwrap());
        assert!(!store
            .record_download(&record.id, None, "10.0.0.2")
            .await
            .unwrap());

        let got = store.get_file(&record.id).await.unwrap().unwrap();
        assert_eq!(got.downloads, 1);
        // The losing attempt must not leave an access-log row behind.
        let logs = store.list_access_logs(10, 0).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_downloads_at_limit_boundary() {
        let store = Arc::new(test_store());
        let mut record = sample_record();
        record.access_limit = Some(1);
        store.insert_file(record.clone()).await.unwrap();

        let a = {
            let store = store.clone();
            let id = record.id.clone();
            tokio::spawn(async move { store.record_download(&id, None, "1.1.1.1").await.unwrap() })
        };
        let b = {
            let store = store.clone();
            let id = record.id.clone();
            tokio::spawn(async move { store.record_download(&id, None, "2.2.2.2").await.unwrap() })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        // Exactly one winner.
        assert!(a ^ b);

        let got = store.get_file(&record.id).await.unwrap().unwrap();
        assert_eq!(got.downloads, 1);
    }

    #[tokio::test]
    async fn test_delete_without_history_is_hard() {
        let store = test_store();
        let record = sample_record();
        store.insert_file(record.clone()).await.unwrap();

        let outcome = store.delete_file(&record.id).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(store.get_file(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_with_history_tombstones() {
        let store = test_store();
        let mut record = sample_record();
        record.expires_at = Some(Utc::now() + Duration::hours(1));
        store.insert_file(record.clone()).await.unwrap();
        store
            .append_access_log(&record.id, Some(1), "127.0.0.1", "download")
            .await
            .unwrap();

        let outcome = store.delete_file(&record.id).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Tombstoned);

        let got = store.get_file(&record.id).await.unwrap().unwrap();
        assert_eq!(got.owner_id, None);
        assert!(got.is_private);
        assert_eq!(got.expires_at, None);
        // The storage key stays attached to the tombstone so the
        // sweeper does not treat a re-used key as live.
        assert_eq!(got.storage_key, record.storage_key);
    }

    #[tokio::test]
    async fn test_expired_files_query() {
        let store = test_store();
        let now = Utc::now();

        let mut expired = sample_record();
        expired.expires_at = Some(now - Duration::seconds(5));
        let mut live = sample_record();
        live.expires_at = Some(now + Duration::hours(1));
        let eternal = sample_record();

        store.insert_file(expired.clone()).await.unwrap();
        store.insert_file(live).await.unwrap();
        store.insert_file(eternal).await.unwrap();

        let found = store.expired_files(now).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, expired.id);
    }

    #[tokio::test]
    async fn test_storage_keys_include_tombstones() {
        let store = test_store();
        let record = sample_record();
        store.insert_file(record.clone()).await.unwrap();
        store.tombstone_file(&record.id).await.unwrap();

        let keys = store.storage_keys().await.unwrap();
        assert_eq!(keys, vec![record.storage_key]);
    }

    #[tokio::test]
    async fn test_settings_seed_and_override() {
        let store = test_store();
        store.seed_settings().unwrap();

        let settings = store.get_settings().await.unwrap();
        assert_eq!(settings.get("maxFileSize").map(String::as_str), Some("5242880"));
        assert_eq!(
            settings.get("maxAnonymousFileExpirationHours").map(String::as_str),
            Some("24")
        );

        store.put_setting("maxFileSize", "99999").await.unwrap();
        // Re-seeding never clobbers operator values.
        store.seed_settings().unwrap();
        let settings = store.get_settings().await.unwrap();
        assert_eq!(settings.get("maxFileSize").map(String::as_str), Some("99999"));
    }

    #[tokio::test]
    async fn test_audit_append_and_list_newest_first() {
        let store = test_store();
        store
            .append_audit(Some(1), "UPLOAD_FILE", serde_json::json!({"fileId": "a"}))
            .await
            .unwrap();
        store
            .append_audit(None, "DOWNLOAD_FILE", serde_json::json!({"fileId": "a"}))
            .await
            .unwrap();

        let entries = store.list_audit(10, 0).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "DOWNLOAD_FILE");
        assert_eq!(entries[1].action, "UPLOAD_FILE");
        assert_eq!(entries[1].user_id, Some(1));
    }
}
