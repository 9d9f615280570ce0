//! `StorageKey`: the pure-value hierarchical key described in §3 and laid out
//! in §6 ("Persistent state layout"). Canonical form is a slash-separated
//! path; `org/domain/` is always a list boundary so callers can page a whole
//! domain without touching another tenant's prefix.
//!
//! Messages are time-partitioned (`YYYY/MM`) for pruning and listing
//! locality; attachments are content-addressed and therefore *not*
//! time-partitioned — partitioning by upload date would scatter identical
//! content across prefixes for no benefit once it's deduplicated.

use std::fmt;

/// `(orgId, domainId, userId?, sharedMailboxId?)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub org_id: String,
    pub domain_id: String,
    pub user_id: Option<String>,
    pub shared_mailbox_id: Option<String>,
}

impl Scope {
    pub fn domain(org_id: impl Into<String>, domain_id: impl Into<String>) -> Self {
        Scope {
            org_id: org_id.into(),
            domain_id: domain_id.into(),
            user_id: None,
            shared_mailbox_id: None,
        }
    }

    pub fn user(org_id: impl Into<String>, domain_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Scope {
            org_id: org_id.into(),
            domain_id: domain_id.into(),
            user_id: Some(user_id.into()),
            shared_mailbox_id: None,
        }
    }

    pub fn shared_mailbox(
        org_id: impl Into<String>,
        domain_id: impl Into<String>,
        shared_mailbox_id: impl Into<String>,
    ) -> Self {
        Scope {
            org_id: org_id.into(),
            domain_id: domain_id.into(),
            user_id: None,
            shared_mailbox_id: Some(shared_mailbox_id.into()),
        }
    }

    /// The `org/domain/` prefix that every key under this scope's domain
    /// shares — the required list boundary from §3.
    pub fn domain_prefix(&self) -> String {
        format!("{}/{}/", self.org_id, self.domain_id)
    }
}

/// A year/month partition, e.g. `2026/07`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8,
}

impl YearMonth {
    pub fn new(year: u16, month: u8) -> Self {
        debug_assert!((1..=12).contains(&month));
        YearMonth { year, month }
    }

    pub fn from_timestamp(ts: crate::Timestamp) -> Self {
        use chrono::Datelike;
        YearMonth {
            year: ts.year() as u16,
            month: ts.month() as u8,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}", self.year, self.month)
    }
}

/// The object kind. Each variant's path shape is disjoint from every other's
/// so two kinds can never collide on the same key (§3 invariant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// `{user}/messages/{YYYY}/{MM}/{messageId}`
    Message { when: YearMonth, message_id: String },
    /// `{user}/attachments/{attachmentId}` — content-addressed, no time partition.
    Attachment { attachment_id: String },
    /// `shared/{sharedMailboxId}/messages/{YYYY}/{MM}/{messageId}`
    Shared { when: YearMonth, message_id: String },
    /// `exports/{jobId}.{format}[.gz][.enc]`
    Export {
        job_id: String,
        format: String,
        compressed: bool,
        encrypted: bool,
    },
    /// `{user}/archive/{YYYY}/{MM}/{messageId}`
    Archive { when: YearMonth, message_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey {
    pub scope: Scope,
    pub kind: Kind,
}

impl StorageKey {
    pub fn message(scope: Scope, when: YearMonth, message_id: impl Into<String>) -> Self {
        StorageKey {
            scope,
            kind: Kind::Message {
                when,
                message_id: message_id.into(),
            },
        }
    }

    pub fn attachment(scope: Scope, attachment_id: impl Into<String>) -> Self {
        StorageKey {
            scope,
            kind: Kind::Attachment {
                attachment_id: attachment_id.into(),
            },
        }
    }

    pub fn shared(scope: Scope, when: YearMonth, message_id: impl Into<String>) -> Self {
        StorageKey {
            scope,
            kind: Kind::Shared {
                when,
                message_id: message_id.into(),
            },
        }
    }

    pub fn export(scope: Scope, job_id: impl Into<String>, format: impl Into<String>, compressed: bool, encrypted: bool) -> Self {
        StorageKey {
            scope,
            kind: Kind::Export {
                job_id: job_id.into(),
                format: format.into(),
                compressed,
                encrypted,
            },
        }
    }

    pub fn archive(scope: Scope, when: YearMonth, message_id: impl Into<String>) -> Self {
        StorageKey {
            scope,
            kind: Kind::Archive {
                when,
                message_id: message_id.into(),
            },
        }
    }

    /// The domain list boundary this key lives under (§3: "domain prefix
    /// `org/domain/` is a required list boundary").
    pub fn domain_prefix(&self) -> String {
        self.scope.domain_prefix()
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope.org_id, self.scope.domain_id)?;
        match &self.kind {
            Kind::Message { when, message_id } => {
                let user = self.scope.user_id.as_deref().unwrap_or("_");
                write!(f, "/{user}/messages/{when}/{message_id}")
            }
            Kind::Attachment { attachment_id } => {
                let user = self.scope.user_id.as_deref().unwrap_or("_");
                write!(f, "/{user}/attachments/{attachment_id}")
            }
            Kind::Shared { when, message_id } => {
                let shared = self.scope.shared_mailbox_id.as_deref().unwrap_or("_");
                write!(f, "/shared/{shared}/messages/{when}/{message_id}")
            }
            Kind::Export {
                job_id,
                format,
                compressed,
                encrypted,
            } => {
                write!(f, "/exports/{job_id}.{format}")?;
                if *compressed {
                    write!(f, ".gz")?;
                }
                if *encrypted {
                    write!(f, ".enc")?;
                }
                Ok(())
            }
            Kind::Archive { when, message_id } => {
                let user = self.scope.user_id.as_deref().unwrap_or("_");
                write!(f, "/{user}/archive/{when}/{message_id}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scope() -> Scope {
        Scope::user("org1", "example.com", "user1")
    }

    #[test]
    fn message_key_matches_layout() {
        let key = StorageKey::message(sample_scope(), YearMonth::new(2026, 7), "msg1");
        assert_eq!(
            key.to_string(),
            "org1/example.com/user1/messages/2026/07/msg1"
        );
    }

    #[test]
    fn attachment_key_is_not_time_partitioned() {
        let key = StorageKey::attachment(sample_scope(), "att1");
        assert_eq!(key.to_string(), "org1/example.com/user1/attachments/att1");
    }

    #[test]
    fn export_key_appends_compression_and_encryption_suffixes() {
        let key = StorageKey::export(
            Scope::domain("org1", "example.com"),
            "job1",
            "mbox",
            true,
            true,
        );
        assert_eq!(key.to_string(), "org1/example.com/exports/job1.mbox.gz.enc");
    }

    #[test]
    fn different_kinds_never_collide_for_same_identifiers() {
        let scope = sample_scope();
        let message = StorageKey::message(scope.clone(), YearMonth::new(2026, 7), "same-id");
        let archive = StorageKey::archive(scope, YearMonth::new(2026, 7), "same-id");
        assert_ne!(message.to_string(), archive.to_string());
    }

    #[test]
    fn domain_prefix_is_a_list_boundary() {
        let key = StorageKey::message(sample_scope(), YearMonth::new(2026, 7), "msg1");
        assert!(key.to_string().starts_with(&key.domain_prefix()));
        assert_eq!(key.domain_prefix(), "org1/example.com/");
    }
}
