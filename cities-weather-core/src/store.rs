//! Blob store adapter backing the per-city datasets.
//!
//! The pipeline only ever needs four operations over named blobs; anything
//! that provides them can hold the datasets. `FsBlobStore` backs a bucket
//! with a local directory, `MemoryBlobStore` keeps blobs in a map.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::StoreError;

mod fs;
mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Named-blob capability set required by the pipeline.
#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    async fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Read a blob, failing with [`StoreError::NotFound`] if it is absent.
    async fn read(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Fully replace the named blob. A reader never observes a mix of old
    /// and new content.
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove a blob; absent names are a no-op.
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}
