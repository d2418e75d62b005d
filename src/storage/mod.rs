//! Blob storage backends.

pub mod backend;
pub mod local;
