//! HTTP API handlers.

pub mod admin;
pub mod files;

use axum::http::HeaderMap;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::net::SocketAddr;

use crate::store::records::FileRecord;

/// Build the standard `{success, message, data}` response body.
pub fn envelope(message: &str, data: Value) -> Value {
    json!({
        "success": true,
        "message": message,
        "data": data,
    })
}

/// Format a timestamp for JSON responses (RFC 3339, millisecond UTC).
pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize a record for clients.  The stored password never leaves
/// the server; clients only learn whether one is set.
pub fn file_view(record: &FileRecord) -> Value {
    json!({
        "id": record.id,
        "ownerId": record.owner_id,
        "fileName": record.display_name,
        "size": record.size,
        "isPrivate": record.is_private,
        "passwordProtected": record.password.is_some(),
        "expiresAt": record.expires_at.map(fmt_ts),
        "accessLimit": record.access_limit,
        "downloads": record.downloads,
        "createdAt": fmt_ts(record.created_at),
    })
}

/// Best-effort client address for the access log: the first
/// `x-forwarded-for` hop when present, else the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}
