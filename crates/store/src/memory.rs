//! In-memory [`ObjectStore`] backend: single-node, non-durable, used by tests
//! and by deployments that accept losing blob data on restart (§9: "blob
//! backend identity resolved to an in-memory implementation for the default,
//! zero-dependency deployment").

use crate::{presign::TokenDirection, ListPage, ObjectMetadata, ObjectStore, PresignedUrl, PutOptions, TokenStore};
use ahash::AHashMap;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;

struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    last_modified: chrono::DateTime<Utc>,
}

pub struct InMemoryStore {
    objects: RwLock<AHashMap<String, StoredObject>>,
    tokens: TokenStore,
    base_url: String,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            objects: RwLock::new(AHashMap::default()),
            tokens: TokenStore::new(),
            base_url: "mem://presign".to_string(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore::new()
    }
}

fn etag_for(data: &Bytes) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(&self, key: &str, data: Bytes, opts: PutOptions) -> trc::Result<ObjectMetadata> {
        let etag = etag_for(&data);
        let last_modified = Utc::now();
        let size = data.len() as u64;
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: opts.content_type.clone(),
                last_modified,
            },
        );
        Ok(ObjectMetadata {
            key: key.to_string(),
            size,
            content_type: opts.content_type,
            etag,
            last_modified,
        })
    }

    async fn get(&self, key: &str) -> trc::Result<Bytes> {
        self.objects
            .read()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "object not found"))
    }

    async fn head(&self, key: &str) -> trc::Result<ObjectMetadata> {
        self.objects
            .read()
            .get(key)
            .map(|o| ObjectMetadata {
                key: key.to_string(),
                size: o.data.len() as u64,
                content_type: o.content_type.clone(),
                etag: etag_for(&o.data),
                last_modified: o.last_modified,
            })
            .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "object not found"))
    }

    async fn delete(&self, key: &str) -> trc::Result<()> {
        self.objects.write().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> trc::Result<ListPage> {
        let objects = self.objects.read();
        let mut keys: Vec<&String> = objects.keys().filter(|k| k.starts_with(prefix)).collect();
        keys.sort();
        let start = match cursor {
            Some(c) => keys.iter().position(|k| k.as_str() > c).unwrap_or(keys.len()),
            None => 0,
        };
        let page: Vec<&String> = keys.into_iter().skip(start).take(limit).collect();
        let next_cursor = if page.len() == limit { page.last().map(|k| k.to_string()) } else { None };
        let entries = page
            .into_iter()
            .map(|k| {
                let o = &objects[k];
                ObjectMetadata {
                    key: k.clone(),
                    size: o.data.len() as u64,
                    content_type: o.content_type.clone(),
                    etag: etag_for(&o.data),
                    last_modified: o.last_modified,
                }
            })
            .collect();
        Ok(ListPage { entries, next_cursor })
    }

    async fn copy(&self, source_key: &str, dest_key: &str) -> trc::Result<ObjectMetadata> {
        let data = self.get(source_key).await?;
        let content_type = self.head(source_key).await.ok().and_then(|m| m.content_type);
        self.put(dest_key, data, PutOptions { content_type }).await
    }

    async fn presign_upload(&self, key: &str, ttl_secs: u64) -> trc::Result<PresignedUrl> {
        Ok(self.tokens.mint(key, TokenDirection::Upload, crate::clamp_presign_ttl(ttl_secs), &self.base_url))
    }

    async fn presign_download(&self, key: &str, ttl_secs: u64) -> trc::Result<PresignedUrl> {
        Ok(self.tokens.mint(key, TokenDirection::Download, crate::clamp_presign_ttl(ttl_secs), &self.base_url))
    }

    async fn complete_presigned_upload(&self, token: &str, data: Bytes) -> trc::Result<ObjectMetadata> {
        let key = self.tokens.redeem(token, TokenDirection::Upload)?;
        self.put(&key, data, PutOptions::default()).await
    }

    async fn redeem_presigned_download(&self, token: &str) -> trc::Result<Bytes> {
        let key = self.tokens.redeem(token, TokenDirection::Download)?;
        self.get(&key).await
    }
}
