//! Abstract blob storage trait.
//!
//! Every backend must implement [`BlobStore`].  The trait works in
//! terms of opaque storage keys so callers never see filesystem paths
//! or user-supplied names.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;

/// A stored blob's data plus its content hash.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Raw bytes of the blob.
    pub data: Bytes,
    /// Hex-encoded SHA-256 content hash.
    pub content_hash: String,
}

/// One entry from a storage listing.
#[derive(Debug, Clone)]
pub struct BlobEntry {
    /// Storage key (file name under the content root).
    pub key: String,
    /// Last-modified time, used by the sweeper's orphan grace period.
    pub modified: SystemTime,
}

/// Async blob storage contract.
///
/// `put` must only return once the write is durable: a record may not
/// become visible to readers before its blob is.
pub trait BlobStore: Send + Sync + 'static {
    /// Write `data` under `storage_key`, durably.
    fn put(
        &self,
        storage_key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Read the full blob at `storage_key`.
    fn get(
        &self,
        storage_key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<StoredBlob>> + Send + '_>>;

    /// Delete the blob at `storage_key`.  Idempotent.
    fn delete(
        &self,
        storage_key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Check whether a blob exists at `storage_key`.
    fn exists(
        &self,
        storage_key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>>;

    /// Enumerate every blob with its last-modified time.
    fn list(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<BlobEntry>>> + Send + '_>>;

    /// Rename a blob from `src_key` to `dst_key` (the sweeper's
    /// pending-deletion tagging).
    fn rename(
        &self,
        src_key: &str,
        dst_key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}
