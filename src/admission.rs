//! Upload admission control.
//!
//! Validates an incoming upload against the active [`UploadPolicy`],
//! resolves its expiry, strips options anonymous requesters may not
//! use, and produces the [`FileRecord`] to persist.  Blob persistence
//! and record insertion happen in the handler, in that order.

use chrono::{DateTime, Duration, Utc};

use crate::auth::Identity;
use crate::errors::ApiError;
use crate::settings::UploadPolicy;
use crate::store::records::{generate_file_id, generate_storage_key, FileRecord};

/// Options a requester may attach to an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub expires_at: Option<DateTime<Utc>>,
    pub password: Option<String>,
    pub is_private: bool,
    pub access_limit: Option<u32>,
}

/// Validate an upload and produce the record to persist.
///
/// Anonymous uploads are always public, unprotected, and
/// unlimited-access, but time-bounded: privacy, password, and access
/// limit are stripped regardless of what was submitted, and any
/// supplied expiry is clamped to the anonymous bound.
pub fn admit(
    requester: Option<Identity>,
    display_name: &str,
    size: u64,
    options: UploadOptions,
    policy: &UploadPolicy,
    now: DateTime<Utc>,
) -> Result<FileRecord, ApiError> {
    let ceiling = policy.size_ceiling(requester.is_some());
    if size > ceiling {
        return Err(ApiError::Validation(format!(
            "File exceeds the maximum size of {} MB.",
            ceiling as f64 / 1024.0 / 1024.0
        )));
    }

    let anonymous_bound = now + Duration::hours(policy.max_anonymous_expiration_hours);

    let expires_at = match (requester, options.expires_at) {
        // Authenticated, explicit expiry: honored as-is.
        (Some(_), Some(at)) => Some(at),
        // Authenticated, none supplied: never expires.  Deliberately
        // not defaulted from `defaultExpirationHours`.
        (Some(_), None) => None,
        // Anonymous: supplied expiry clamped to the anonymous bound.
        (None, Some(at)) => Some(at.min(anonymous_bound)),
        // Anonymous, none supplied: bounded default.
        (None, None) => Some(anonymous_bound),
    };

    let (is_private, password, access_limit) = match requester {
        Some(_) => (
            options.is_private,
            options.password,
            // A limit of zero means unlimited, not never-downloadable.
            options.access_limit.filter(|&limit| limit > 0),
        ),
        None => (false, None, None),
    };

    Ok(FileRecord {
        id: generate_file_id(),
        owner_id: requester.map(|r| r.id),
        storage_key: generate_storage_key(),
        display_name: display_name.to_string(),
        is_private,
        password,
        expires_at,
        access_limit,
        downloads: 0,
        size,
        created_at: now,
    })
}
