//! Shared data model (§3) for the storage and policy plane: storage keys,
//! message/attachment metadata, quota records, retention policy and legal
//! hold records, and export/deletion job state. Component crates (`store`,
//! `dedup`, `quota`, `retention`, `jobs`) hold the *logic*; this crate holds
//! the *shapes*, the way the teacher's `common` crate holds `Account`,
//! `Mailbox`, `MailboxState` while `store`/`jmap` hold the logic that
//! operates on them.

pub mod job;
pub mod key;
pub mod message;
pub mod quota;
pub mod retention;

pub use job::{DeletionAuditEntry, DeletionJob, DeletionJobType, DeletionAuditEvent, ExportJob, JobStatus};
pub use key::{Kind as KeyKind, Scope, StorageKey};
pub use message::{AttachmentBlob, AttachmentReference, MessageMetadata};
pub use quota::{Quota, QuotaLevel, QuotaUsageSnapshot};
pub use retention::{ComplianceType, LegalHold, LegalHoldScope, RetentionAction, RetentionPolicy};

use chrono::{DateTime, Utc};

/// All timestamps are UTC instants (§3).
pub type Timestamp = DateTime<Utc>;

pub fn now() -> Timestamp {
    Utc::now()
}

pub use utils::OpaqueId;
