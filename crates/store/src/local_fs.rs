//! Local-filesystem [`ObjectStore`] backend: durable across restarts, no
//! external vendor dependency. Keys map directly onto relative paths under
//! `root_dir`; sibling directories are created lazily on put.

use crate::{presign::TokenDirection, ListPage, ObjectMetadata, ObjectStore, PresignedUrl, PutOptions, TokenStore};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub struct LocalFsStore {
    root_dir: PathBuf,
    tokens: TokenStore,
    base_url: String,
}

impl LocalFsStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        LocalFsStore {
            root_dir: root_dir.into(),
            tokens: TokenStore::new(),
            base_url: "file://presign".to_string(),
        }
    }

    /// Rejects keys that could escape `root_dir` via `..` traversal.
    fn resolve(&self, key: &str) -> trc::Result<PathBuf> {
        if key.split('/').any(|segment| segment == "..") {
            return Err(trc::Error::resource(trc::ResourceEvent::BadParameters, "object key must not contain '..'"));
        }
        Ok(self.root_dir.join(key))
    }

    async fn metadata_for(&self, key: &str, path: &Path) -> trc::Result<ObjectMetadata> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| trc::Error::storage(trc::StorageEvent::BackendError, "failed to stat object").details(e.to_string()))?;
        let modified: DateTime<Utc> = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
        Ok(ObjectMetadata {
            key: key.to_string(),
            size: meta.len(),
            content_type: None,
            etag: String::new(),
            last_modified: modified,
        })
    }
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    async fn put(&self, key: &str, data: Bytes, opts: PutOptions) -> trc::Result<ObjectMetadata> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| trc::Error::storage(trc::StorageEvent::BackendError, "failed to create parent directory").details(e.to_string()))?;
        }
        let etag = blake3::hash(&data).to_hex().to_string();
        let size = data.len() as u64;
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| trc::Error::storage(trc::StorageEvent::BackendError, "failed to create object").details(e.to_string()))?;
        file.write_all(&data)
            .await
            .map_err(|e| trc::Error::storage(trc::StorageEvent::BackendError, "failed to write object").details(e.to_string()))?;
        Ok(ObjectMetadata {
            key: key.to_string(),
            size,
            content_type: opts.content_type,
            etag,
            last_modified: Utc::now(),
        })
    }

    async fn get(&self, key: &str) -> trc::Result<Bytes> {
        let path = self.resolve(key)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|_| trc::Error::resource(trc::ResourceEvent::NotFound, "object not found"))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .await
            .map_err(|e| trc::Error::storage(trc::StorageEvent::BackendError, "failed to read object").details(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    async fn head(&self, key: &str) -> trc::Result<ObjectMetadata> {
        let path = self.resolve(key)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(trc::Error::resource(trc::ResourceEvent::NotFound, "object not found"));
        }
        self.metadata_for(key, &path).await
    }

    async fn delete(&self, key: &str) -> trc::Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(trc::Error::storage(trc::StorageEvent::BackendError, "failed to delete object").details(e.to_string())),
        }
    }

    async fn list(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> trc::Result<ListPage> {
        let root = self.resolve(prefix)?;
        let mut keys = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(_) => continue,
            };
            while let Ok(Some(entry)) = read_dir.next_entry().await {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.root_dir) {
                    keys.push(rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
                }
            }
        }
        keys.sort();
        let start = match cursor {
            Some(c) => keys.iter().position(|k| k.as_str() > c).unwrap_or(keys.len()),
            None => 0,
        };
        let page: Vec<String> = keys.into_iter().skip(start).take(limit).collect();
        let next_cursor = if page.len() == limit { page.last().cloned() } else { None };
        let mut entries = Vec::with_capacity(page.len());
        for key in page {
            let path = self.root_dir.join(&key);
            entries.push(self.metadata_for(&key, &path).await?);
        }
        Ok(ListPage { entries, next_cursor })
    }

    async fn copy(&self, source_key: &str, dest_key: &str) -> trc::Result<ObjectMetadata> {
        let data = self.get(source_key).await?;
        self.put(dest_key, data, PutOptions::default()).await
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
