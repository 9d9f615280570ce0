//! Message and attachment metadata records (§3).

use crate::{key::Scope, StorageKey, Timestamp};

#[derive(Debug, Clone)]
pub struct MessageMetadata {
    pub scope: Scope,
    pub mailbox_id: String,
    pub folder_id: String,
    pub message_id: String,
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    pub date: Timestamp,
    /// Authoritative for quota accounting.
    pub size: u64,
    pub has_attachments: bool,
    pub flags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MessageMetadata {
    pub fn is_starred(&self) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case("starred") || f.eq_ignore_ascii_case("\\flagged"))
    }

    pub fn has_any_label(&self, labels: &[String]) -> bool {
        labels.iter().any(|l| self.flags.iter().any(|f| f.eq_ignore_ascii_case(l)))
    }
}

/// The content-addressed body of an attachment. Invariant:
/// `refCount = 0 ⇒ eligible for GC after quarantine window`; a blob with
/// `refCount > 0` is immutable (§3).
#[derive(Debug, Clone)]
pub struct AttachmentBlob {
    pub attachment_id: String,
    /// SHA-256, hex-encoded.
    pub content_hash: String,
    pub content_type: String,
    pub size: u64,
    pub ref_count: u64,
    pub created_at: Timestamp,
    pub storage_key: StorageKey,
    /// Set when `ref_count` drops to zero; cleared if a new reference
    /// arrives before the quarantine window elapses (§4.B).
    pub quarantined_since: Option<Timestamp>,
}

impl AttachmentBlob {
    pub fn is_immutable(&self) -> bool {
        self.ref_count > 0
    }

    pub fn is_eligible_for_gc(&self, quarantine: chrono::Duration, now: Timestamp) -> bool {
        self.ref_count == 0
            && self
                .quarantined_since
                .is_some_and(|since| now - since >= quarantine)
    }
}

/// A message's pointer to a blob. `filename` lives here, not on the blob,
/// because many references (across many messages) can share one blob (§3).
#[derive(Debug, Clone)]
pub struct AttachmentReference {
    pub reference_id: String,
    pub message_id: String,
    pub attachment_id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}
