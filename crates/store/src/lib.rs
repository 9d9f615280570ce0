//! Object store gateway (§4.A): a single [`ObjectStore`] trait in front of
//! whichever blob backend is configured, so every other component talks to
//! storage through one seam instead of a backend-specific client.
//!
//! Two backends ship: [`memory::InMemoryStore`] for tests and single-node
//! deployments, and [`local_fs::LocalFsStore`] for durable single-node
//! storage. Both honor the same presigned-URL contract by minting an opaque,
//! time-limited token rather than delegating to a vendor's signature scheme.

pub mod local_fs;
pub mod memory;
pub mod presign;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use local_fs::LocalFsStore;
pub use memory::InMemoryStore;
pub use presign::{PresignedUrl, TokenStore};

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

/// One page of a [`ObjectStore::list`] call.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<ObjectMetadata>,
    pub next_cursor: Option<String>,
}

/// The minimum and maximum a caller may request for a presigned URL's
/// validity window (§4.A: "TTL clamped to [1 minute, 7 days]").
pub const MIN_PRESIGN_TTL_SECS: u64 = 60;
pub const MAX_PRESIGN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

pub fn clamp_presign_ttl(requested_secs: u64) -> u64 {
    requested_secs.clamp(MIN_PRESIGN_TTL_SECS, MAX_PRESIGN_TTL_SECS)
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, opts: PutOptions) -> trc::Result<ObjectMetadata>;

    async fn get(&self, key: &str) -> trc::Result<Bytes>;

    async fn head(&self, key: &str) -> trc::Result<ObjectMetadata>;

    async fn delete(&self, key: &str) -> trc::Result<()>;

    /// Lists keys under `prefix`. `cursor` is the opaque token from a prior
    /// page's [`ListPage::next_cursor`].
    async fn list(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> trc::Result<ListPage>;

    async fn copy(&self, source_key: &str, dest_key: &str) -> trc::Result<ObjectMetadata>;

    /// Mints a time-limited upload token. The caller later calls
    /// [`ObjectStore::complete_presigned_upload`] with the same token.
    async fn presign_upload(&self, key: &str, ttl_secs: u64) -> trc::Result<PresignedUrl>;

    async fn presign_download(&self, key: &str, ttl_secs: u64) -> trc::Result<PresignedUrl>;

    /// Redeems an upload token minted by [`ObjectStore::presign_upload`].
    /// Real vendor-backed stores would not need this (the client talks
    /// directly to the vendor); the in-process backends simulate the same
    /// two-step flow so callers don't need backend-specific code (§9).
    async fn complete_presigned_upload(&self, token: &str, data: Bytes) -> trc::Result<ObjectMetadata>;

    async fn redeem_presigned_download(&self, token: &str) -> trc::Result<Bytes>;
}
