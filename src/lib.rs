//! Sharebox: a self-hosted file sharing service.
//!
//! Files are uploaded through an admission controller that enforces the
//! operator's upload policy, served through an authorization engine
//! that gates every access, and retired by a background sweeper that
//! expires records and reaps orphaned blobs.

pub mod admission;
pub mod audit;
pub mod auth;
pub mod authz;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod settings;
pub mod storage;
pub mod store;
pub mod sweeper;

use std::sync::Arc;

use crate::audit::AuditSink;
use crate::config::Config;
use crate::storage::backend::BlobStore;
use crate::store::records::FileStore;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Parsed configuration.
    pub config: Arc<Config>,
    /// File record store.
    pub store: Arc<dyn FileStore>,
    /// Blob storage backend.
    pub storage: Arc<dyn BlobStore>,
    /// Fire-and-forget activity logger.
    pub audit: AuditSink,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn FileStore>, storage: Arc<dyn BlobStore>) -> Self {
        let audit = AuditSink::new(store.clone());
        Self {
            config: Arc::new(config),
            store,
            storage,
            audit,
        }
    }
}
