//! Typed upload policy parsed from the string settings table.
//!
//! Settings are stored as strings keyed by name.  [`UploadPolicy`]
//! parses the recognized keys at the point of use, falling back to
//! fixed defaults when a key is absent or unparseable.  The fallback
//! for `maxFileSize` (10 MiB) intentionally differs from the seeded
//! value (5 MiB); both are preserved as documented behavior.

use std::collections::HashMap;

/// Fallback size ceiling for authenticated uploads: 10 MiB.
const FALLBACK_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Fallback size ceiling for anonymous uploads: 5 MiB.
const FALLBACK_MAX_ANONYMOUS_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Fallback expiry bound for anonymous uploads: 24 hours.
const FALLBACK_MAX_ANONYMOUS_EXPIRATION_HOURS: i64 = 24;

/// Upload policy consulted by the admission controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Size ceiling in bytes for authenticated uploads.
    pub max_file_size: u64,
    /// Default expiry in hours for authenticated uploads; `None` means
    /// authenticated files never expire unless an expiry is supplied.
    pub default_expiration_hours: Option<i64>,
    /// Size ceiling in bytes for anonymous uploads.
    pub max_anonymous_file_size: u64,
    /// Hard expiry bound in hours for anonymous uploads.
    pub max_anonymous_expiration_hours: i64,
}

impl UploadPolicy {
    /// Build a policy from the raw settings map.
    pub fn from_map(settings: &HashMap<String, String>) -> Self {
        Self {
            max_file_size: parse_u64(settings, "maxFileSize").unwrap_or(FALLBACK_MAX_FILE_SIZE),
            default_expiration_hours: parse_i64(settings, "defaultExpirationHours"),
            max_anonymous_file_size: parse_u64(settings, "maxAnonymousFileSize")
                .unwrap_or(FALLBACK_MAX_ANONYMOUS_FILE_SIZE),
            max_anonymous_expiration_hours: parse_i64(settings, "maxAnonymousFileExpirationHours")
                .unwrap_or(FALLBACK_MAX_ANONYMOUS_EXPIRATION_HOURS),
        }
    }

    /// Size ceiling for a requester, in bytes.
    pub fn size_ceiling(&self, authenticated: bool) -> u64 {
        if authenticated {
            self.max_file_size
        } else {
            self.max_anonymous_file_size
        }
    }
}

fn parse_u64(settings: &HashMap<String, String>, key: &str) -> Option<u64> {
    settings.get(key).and_then(|v| v.trim().parse().ok())
}

fn parse_i64(settings: &HashMap<String, String>, key: &str) -> Option<i64> {
    settings.get(key).and_then(|v| v.trim().parse().ok())
}
