//! Local filesystem blob storage.
//!
//! Blobs are stored as flat files under a configurable content
//! directory, named by their opaque storage key.  Display names never
//! touch the filesystem.
//!
//! All writes follow the temp-fsync-rename pattern so a record is only
//! created once its blob is durable.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;

use super::backend::{BlobEntry, BlobStore, StoredBlob};

/// Stores blobs on the local filesystem.
pub struct LocalBlobStore {
    /// Content directory for all stored blobs.
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new `LocalBlobStore` rooted at `root`.
    ///
    /// The directory will be created if it does not exist.
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        // Also create the .tmp directory for atomic writes.
        std::fs::create_dir_all(root.join(".tmp"))?;
        Ok(Self { root })
    }

    /// Resolve a storage key to an absolute file path.
    ///
    /// Keys are generated internally as hex strings, but reject path
    /// separators and parent components anyway so a corrupted record
    /// cannot escape the content root.
    fn resolve(&self, storage_key: &str) -> anyhow::Result<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains('/')
            || storage_key.contains('\\')
            || storage_key.contains("..")
        {
            anyhow::bail!("invalid storage key: {}", storage_key);
        }
        Ok(self.root.join(storage_key))
    }

    /// Generate a temp file path under .tmp/ for atomic writes.
    fn temp_path(&self) -> PathBuf {
        let id = uuid::Uuid::new_v4();
        self.root.join(".tmp").join(format!("tmp-{}", id))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(
        &self,
        storage_key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let storage_key = storage_key.to_string();
        Box::pin(async move {
            let final_path = self.resolve(&storage_key)?;

            // Temp-fsync-rename: the blob is durable before it becomes
            // visible under its final key.
            let tmp_path = self.temp_path();
            if let Some(parent) = tmp_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;

            std::fs::rename(&tmp_path, &final_path)?;

            Ok(())
        })
    }

    fn get(
        &self,
        storage_key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<StoredBlob>> + Send + '_>> {
        let storage_key = storage_key.to_string();
        Box::pin(async move {
            let path = self.resolve(&storage_key)?;

            if !path.exists() {
                anyhow::bail!("blob not found at storage key: {}", storage_key);
            }

            let data = Bytes::from(std::fs::read(&path)?);

            let mut hasher = Sha256::new();
            hasher.update(&data);
            let content_hash = hex::encode(hasher.finalize());

            Ok(StoredBlob { data, content_hash })
        })
    }

    fn delete(
        &self,
        storage_key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let storage_key = storage_key.to_string();
        Box::pin(async move {
            let path = self.resolve(&storage_key)?;

            // Idempotent: if the file doesn't exist, that's fine.
            if path.exists() {
                std::fs::remove_file(&path)?;
            }

            Ok(())
        })
    }

    fn exists(
        &self,
        storage_key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let storage_key = storage_key.to_string();
        Box::pin(async move {
            let path = self.resolve(&storage_key)?;
            Ok(path.exists() && path.is_file())
        })
    }

    fn list(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<BlobEntry>>> + Send + '_>> {
        Box::pin(async move {
            let mut entries = Vec::new();
            for entry in std::fs::read_dir(&self.root)? {
                let entry = entry?;
                // Skip the .tmp staging directory.
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let key = entry.file_name().to_string_lossy().into_owned();
                let modified = entry.metadata()?.modified()?;
                entries.push(BlobEntry { key, modified });
            }
            Ok(entries)
        })
    }

    fn rename(
        &self,
        src_key: &str,
        dst_key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let src_key = src_key.to_string();
        let dst_key = dst_key.to_string();
        Box::pin(async move {
            let src = self.resolve(&src_key)?;
            let dst = self.resolve(&dst_key)?;
            std::fs::rename(&src, &dst)?;
            Ok(())
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
