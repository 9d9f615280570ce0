//! Content-addressed deduplication index (§4.B). Blobs are keyed by content
//! hash; reference counts are the single source of truth for whether a blob
//! is immutable, quarantined, or eligible for garbage collection.
//!
//! `register_blob`/`add_reference`/`remove_reference` are the only writers,
//! so each holds the per-hash entry for its whole critical section rather
//! than read-then-write, closing the race the teacher's `dedup` idiom avoids
//! by keeping `DashMap` entries as the unit of atomicity.

use chrono::{DateTime, Utc};
use common::{AttachmentBlob, StorageKey};
use dashmap::DashMap;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DedupStats {
    pub unique_blobs: u64,
    pub total_references: u64,
    pub quarantined: u64,
    pub bytes_saved: u64,
}

pub struct DedupIndex {
    /// Keyed by content hash; `registerBlob` is the only place a new entry
    /// is created (§4.B: "dedup key is the content hash, never the
    /// attachment id").
    by_hash: DashMap<String, AttachmentBlob>,
}

impl DedupIndex {
    pub fn new() -> Self {
        DedupIndex { by_hash: DashMap::new() }
    }

    pub fn check_duplicate(&self, content_hash: &str) -> Option<AttachmentBlob> {
        self.by_hash.get(content_hash).map(|e| e.clone())
    }

    /// Registers a new blob, or returns the existing one for this hash
    /// un-mutated (§4.B: "registerBlob is idempotent per content hash").
    pub fn register_blob(
        &self,
        content_hash: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
        storage_key: StorageKey,
        attachment_id: impl Into<String>,
    ) -> AttachmentBlob {
        let content_hash = content_hash.into();
        self.by_hash
            .entry(content_hash.clone())
            .or_insert_with(|| AttachmentBlob {
                attachment_id: attachment_id.into(),
                content_hash,
                content_type: content_type.into(),
                size,
                ref_count: 0,
                created_at: Utc::now(),
                storage_key,
                quarantined_since: None,
            })
            .clone()
    }

    /// Increments the reference count and clears any pending quarantine
    /// (§4.B: "a new reference before the quarantine window elapses
    /// cancels the pending GC").
    pub fn add_reference(&self, content_hash: &str) -> trc::Result<AttachmentBlob> {
        let mut entry = self
            .by_hash
            .get_mut(content_hash)
            .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "blob not registered"))?;
        entry.ref_count += 1;
        entry.quarantined_since = None;
        Ok(entry.clone())
    }

    /// Decrements the reference count; at zero, starts the quarantine clock
    /// rather than deleting immediately (§4.B).
    pub fn remove_reference(&self, content_hash: &str) -> trc::Result<AttachmentBlob> {
        let mut entry = self
            .by_hash
            .get_mut(content_hash)
            .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "blob not registered"))?;
        if entry.ref_count == 0 {
            return Err(trc::Error::dedup(trc::DedupEvent::RefcountUnderflow, "reference count already zero"));
        }
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            entry.quarantined_since = Some(Utc::now());
        }
        Ok(entry.clone())
    }

    /// Sweeps blobs whose quarantine window has elapsed, removing them from
    /// the index and returning the removed records so the caller can delete
    /// the underlying objects (§4.B's orphan GC job).
    pub fn collect_garbage(&self, quarantine: chrono::Duration, now: DateTime<Utc>) -> Vec<AttachmentBlob> {
        let eligible: Vec<String> = self
            .by_hash
            .iter()
            .filter(|e| e.value().is_eligible_for_gc(quarantine, now))
            .map(|e| e.key().clone())
            .collect();
        eligible
            .into_iter()
            .filter_map(|hash| self.by_hash.remove(&hash).map(|(_, v)| v))
            .collect()
    }

    /// Finds blobs whose `ref_count` is zero but which were never
    /// quarantined — a sign a crash interrupted `remove_reference`
    /// (§4.B orphan scan, a defensive sweep independent of `collect_garbage`).
    pub fn scan_orphans(&self) -> Vec<AttachmentBlob> {
        self.by_hash
            .iter()
            .filter(|e| e.value().ref_count == 0 && e.value().quarantined_since.is_none())
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn stats(&self) -> DedupStats {
        let mut stats = DedupStats::default();
        for entry in self.by_hash.iter() {
            let blob = entry.value();
            stats.unique_blobs += 1;
            stats.total_references += blob.ref_count;
            if blob.quarantined_since.is_some() {
                stats.quarantined += 1;
            }
            if blob.ref_count > 1 {
                stats.bytes_saved += blob.size * (blob.ref_count - 1);
            }
        }
        stats
    }
}

impl Default for DedupIndex {
    fn default() -> Self {
        DedupIndex::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::key::Scope;

    fn key() -> StorageKey {
        StorageKey::attachment(Scope::domain("org", "example.com"), "a1")
    }

    #[test]
    fn register_is_idempotent_per_hash() {
        let index = DedupIndex::new();
        let first = index.register_blob("h1", "text/plain", 10, key(), "a1");
        let second = index.register_blob("h1", "text/plain", 10, key(), "a2");
        assert_eq!(first.attachment_id, second.attachment_id);
    }

    #[test]
    fn new_reference_cancels_pending_quarantine() {
        let index = DedupIndex::new();
        index.register_blob("h1", "text/plain", 10, key(), "a1");
        index.add_reference("h1").unwrap();
        let after_remove = index.remove_reference("h1").unwrap();
        assert!(after_remove.quarantined_since.is_some());
        let after_add = index.add_reference("h1").unwrap();
        assert!(after_add.quarantined_since.is_none());
    }

    #[test]
    fn removing_reference_below_zero_errors() {
        let index = DedupIndex::new();
        index.register_blob("h1", "text/plain", 10, key(), "a1");
        let err = index.remove_reference("h1").unwrap_err();
        assert_eq!(err.kind, trc::Kind::Internal);
    }

    #[test]
    fn garbage_collection_only_removes_after_quarantine_elapses() {
        let index = DedupIndex::new();
        index.register_blob("h1", "text/plain", 10, key(), "a1");
        index.add_reference("h1").unwrap();
        index.remove_reference("h1").unwrap();
        let now = Utc::now();
        assert!(index.collect_garbage(chrono::Duration::hours(24), now).is_empty());
        let later = now + chrono::Duration::hours(25);
        let collected = index.collect_garbage(chrono::Duration::hours(24), later);
        assert_eq!(collected.len(), 1);
        assert!(index.check_duplicate("h1").is_none());
    }

    #[test]
    fn stats_count_bytes_saved_across_shared_references() {
        let index = DedupIndex::new();
        index.register_blob("h1", "text/plain", 100, key(), "a1");
        index.add_reference("h1").unwrap();
        index.add_reference("h1").unwrap();
        index.add_reference("h1").unwrap();
        let stats = index.stats();
        assert_eq!(stats.unique_blobs, 1);
        assert_eq!(stats.total_references, 3);
        assert_eq!(stats.bytes_saved, 200);
    }
}
