//! Object store holding mirrored card images.
//!
//! The [`AssetStore`] trait abstracts the two operations mirroring needs:
//! listing every key once at run start and putting new objects.
//!
//! - [`S3AssetStore`]: any S3-compatible service (R2, MinIO, AWS)
//! - [`MemoryAssetStore`]: in-memory store for tests (`mock` feature)

#[cfg(any(test, feature = "mock"))]
mod memory;
mod s3;

use async_trait::async_trait;
use svedb_shared::Result;

#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryAssetStore;
pub use s3::S3AssetStore;

/// Content type of every mirrored object.
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Flat key/value object store.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Every key in the store, following pagination to the end.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
}
