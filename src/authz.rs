//! Access authorization engine.
//!
//! [`authorize`] is a pure function of (record, requester, supplied
//! password, operation) at a given instant -- no hidden state.  Gates
//! are evaluated in a fixed order and short-circuit on the first deny,
//! which is what makes the user-facing error precise: a private file
//! reports the privacy violation before the password mismatch, an
//! expired file reports expiry before the exhausted quota.
//!
//! Record existence and blob presence are the caller's concern; the
//! engine only judges a record it was handed.

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;

use crate::auth::Identity;
use crate::errors::ApiError;
use crate::store::records::FileRecord;

/// The operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Metadata detail view.
    View,
    /// Blob download.
    Download,
}

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deny {
    /// Private file, anonymous requester.
    PrivateAuthRequired,
    /// Private file, requester is neither owner nor admin.
    NotAuthorized,
    /// Password absent or mismatched.
    InvalidPassword,
    /// The record's expiry has passed.
    Expired,
    /// The download quota is exhausted.
    LimitReached,
}

impl From<Deny> for ApiError {
    fn from(deny: Deny) -> Self {
        match deny {
            Deny::PrivateAuthRequired => {
                ApiError::Forbidden("This file is private. Authorization required.".to_string())
            }
            Deny::NotAuthorized => {
                ApiError::Forbidden("You are not authorized to view this file.".to_string())
            }
            Deny::InvalidPassword => ApiError::InvalidPassword,
            Deny::Expired => ApiError::Gone,
            Deny::LimitReached => ApiError::LimitReached,
        }
    }
}

/// Whether `requester` owns `record`.
fn is_owner(record: &FileRecord, requester: Option<&Identity>) -> bool {
    match (record.owner_id, requester) {
        (Some(owner), Some(identity)) => owner == identity.id,
        _ => false,
    }
}

/// Whether `requester` may mutate (edit or delete) `record`: owner or
/// admin only.  Content gates (password, expiry, quota) do not apply
/// to mutation.
pub fn may_mutate(record: &FileRecord, requester: &Identity) -> bool {
    requester.is_admin || is_owner(record, Some(requester))
}

/// Constant-time password comparison.
fn password_matches(stored: &str, supplied: Option<&str>) -> bool {
    match supplied {
        Some(supplied) => stored.as_bytes().ct_eq(supplied.as_bytes()).into(),
        None => false,
    }
}

/// Evaluate an access request against a record.
///
/// Gate order: privacy, password, expiry, quota.  Expiry applies to
/// both operations; quota only to downloads.  The owner bypasses the
/// password gate entirely, even without supplying one; an admin does
/// not.
pub fn authorize(
    record: &FileRecord,
    requester: Option<&Identity>,
    supplied_password: Option<&str>,
    operation: Operation,
    now: DateTime<Utc>,
) -> Result<(), Deny> {
    // Privacy gate.
    if record.is_private {
        match requester {
            None => return Err(Deny::PrivateAuthRequired),
            Some(identity) => {
                if !identity.is_admin && !is_owner(record, requester) {
                    return Err(Deny::NotAuthorized);
                }
            }
        }
    }

    // Password gate: owner bypass only.
    if let Some(stored) = record.password.as_deref() {
        if !password_matches(stored, supplied_password) && !is_owner(record, requester) {
            return Err(Deny::InvalidPassword);
        }
    }

    // Expiry gate.
    if record.is_expired(now) {
        return Err(Deny::Expired);
    }

    // Quota gate, downloads only.
    if operation == Operation::Download {
        if let Some(limit) = record.access_limit {
            if record.downloads >= limit {
                return Err(Deny::LimitReached);
            }
        }
    }

    Ok(())
}
