//! Fire-and-forget activity logging.
//!
//! Audit writes ride alongside request handling and must never change
//! a request's outcome: a failed append is logged and swallowed.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::store::records::FileStore;

/// Audit event names.
pub const UPLOAD_FILE: &str = "UPLOAD_FILE";
pub const DOWNLOAD_FILE: &str = "DOWNLOAD_FILE";
pub const DOWNLOAD_ATTEMPT_FAILED: &str = "DOWNLOAD_ATTEMPT_FAILED";
pub const EDIT_FILE: &str = "EDIT_FILE";
pub const DELETE_FILE: &str = "DELETE_FILE";
pub const DELETE_FILE_SOFT: &str = "DELETE_FILE_SOFT";
pub const UPDATE_SETTINGS: &str = "UPDATE_SETTINGS";

/// Handle for recording audit events.
#[derive(Clone)]
pub struct AuditSink {
    store: Arc<dyn FileStore>,
}

impl AuditSink {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Record one event.  Errors are logged, never propagated.
    pub async fn record(&self, user_id: Option<i64>, action: &str, details: Value) {
        if let Err(err) = self.store.append_audit(user_id, action, details).await {
            warn!(action, error = %err, "failed to append audit event");
        }
    }
}
