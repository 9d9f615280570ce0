//! Deletion job execution (§4.F). Cascades attachments before messages
//! before mailboxes so a crash mid-job never leaves a message pointing at a
//! deleted attachment; re-checks legal holds against the *current* hold set
//! immediately before each delete, since a hold may have been placed after
//! the job was created.

use chrono::{DateTime, Utc};
use common::job::{DeletionAuditEntry, DeletionAuditEvent, DeletionJob};
use common::{JobStatus, LegalHold};
use store::ObjectStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TargetKind {
    Attachment,
    Message,
    Mailbox,
}

#[derive(Debug, Clone)]
pub struct DeletionTarget {
    pub kind: TargetKind,
    pub storage_key: String,
    pub domain_id: String,
    pub user_id: Option<String>,
    pub indexed_terms: Vec<String>,
}

/// Idempotent: a second `approve` call on an already-approved job is a
/// no-op that returns the current state (§8 approval-idempotence property).
pub fn approve(job: &mut DeletionJob, approved_by: &str) {
    if job.approved_by.is_none() {
        job.approved_by = Some(approved_by.to_string());
    }
}

pub struct ExecutionOutcome {
    pub deleted: Vec<String>,
    pub skipped_for_hold: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub async fn execute(
    job: &mut DeletionJob,
    mut targets: Vec<DeletionTarget>,
    holds: &[LegalHold],
    org_id: &str,
    now: DateTime<Utc>,
    object_store: &dyn ObjectStore,
    audit: &mut Vec<DeletionAuditEntry>,
) -> trc::Result<ExecutionOutcome> {
    if !job.is_approved() {
        return Err(trc::Error::job(trc::JobEvent::ApprovalRequired, "deletion job has not been approved"));
    }
    if !job.can_transition_to(JobStatus::Running) {
        return Err(trc::Error::job(trc::JobEvent::InvalidTransition, "deletion job is not in a runnable state"));
    }
    job.status = JobStatus::Running;
    audit.push(DeletionAuditEntry {
        job_id: job.id.clone(),
        at: now,
        actor: job.approved_by.clone().unwrap_or_else(|| job.requested_by.clone()),
        event: DeletionAuditEvent::Started,
        detail: format!("{} targets", targets.len()),
    });

    targets.sort_by_key(|t| t.kind);

    let mut outcome = ExecutionOutcome {
        deleted: Vec::new(),
        skipped_for_hold: Vec::new(),
        failed: Vec::new(),
    };

    for target in &targets {
        if let Some(hold_id) =
            retention::find_covering_hold(holds, org_id, &target.domain_id, target.user_id.as_deref(), now, &target.indexed_terms)
        {
            outcome.skipped_for_hold.push(target.storage_key.clone());
            audit.push(DeletionAuditEntry {
                job_id: job.id.clone(),
                at: now,
                actor: "system".into(),
                event: DeletionAuditEvent::SkippedHold,
                detail: format!("{} held by {}", target.storage_key, hold_id),
            });
            continue;
        }

        match object_store.delete(&target.storage_key).await {
            Ok(()) => {
                outcome.deleted.push(target.storage_key.clone());
                audit.push(DeletionAuditEntry {
                    job_id: job.id.clone(),
                    at: now,
                    actor: "system".into(),
                    event: DeletionAuditEvent::ObjectDeleted,
                    detail: target.storage_key.clone(),
                });
            }
            Err(err) => {
                outcome.failed.push((target.storage_key.clone(), err.to_string()));
            }
        }
    }

    job.status = if outcome.failed.is_empty() { JobStatus::Completed } else { JobStatus::Failed };
    audit.push(DeletionAuditEntry {
        job_id: job.id.clone(),
        at: now,
        actor: "system".into(),
        event: DeletionAuditEvent::Finished,
        detail: format!(
            "deleted={} skipped_for_hold={} failed={}",
            outcome.deleted.len(),
            outcome.skipped_for_hold.len(),
            outcome.failed.len()
        ),
    });

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use common::job::DeletionJobType;
    use common::ComplianceType;
    use store::memory::InMemoryStore;
    use store::PutOptions;

    fn job() -> DeletionJob {
        DeletionJob {
            id: "del1".into(),
            domain_id: "example.com".into(),
            job_type: DeletionJobType::User,
            target_refs: vec![],
            compliance_type: ComplianceType::Gdpr,
            reason: "erasure request".into(),
            requested_by: "user1".into(),
            requires_approval: true,
            approved_by: None,
            scheduled_for: None,
            status: JobStatus::Pending,
            lease: None,
        }
    }

    #[tokio::test]
    async fn unapproved_job_cannot_execute() {
        let mut j = job();
        let store = InMemoryStore::new();
        let mut audit = Vec::new();
        let err = execute(&mut j, vec![], &[], "org1", Utc::now(), &store, &mut audit).await.unwrap_err();
        assert_eq!(err.kind, trc::Kind::Conflict);
    }

    #[tokio::test]
    async fn approve_is_idempotent() {
        let mut j = job();
        approve(&mut j, "admin1");
        approve(&mut j, "admin2");
        assert_eq!(j.approved_by.as_deref(), Some("admin1"));
    }

    #[tokio::test]
    async fn held_targets_are_skipped_not_deleted() {
        let mut j = job();
        approve(&mut j, "admin1");
        let store = InMemoryStore::new();
        store.put("org1/example.com/user1/messages/2026/01/m1", Bytes::from_static(b"x"), PutOptions::default()).await.unwrap();
        let holds = vec![LegalHold {
            id: "hold1".into(),
            scope: common::LegalHoldScope::User,
            scope_id: "user1".into(),
            start_date: Utc::now() - chrono::Duration::days(10),
            end_date: None,
            keywords: None,
            active: true,
        }];
        let targets = vec![DeletionTarget {
            kind: TargetKind::Message,
            storage_key: "org1/example.com/user1/messages/2026/01/m1".into(),
            domain_id: "example.com".into(),
            user_id: Some("user1".into()),
            indexed_terms: vec![],
        }];
        let mut audit = Vec::new();
        let outcome = execute(&mut j, targets, &holds, "org1", Utc::now(), &store, &mut audit).await.unwrap();
        assert_eq!(outcome.skipped_for_hold.len(), 1);
        assert!(outcome.deleted.is_empty());
        assert!(store.get("org1/example.com/user1/messages/2026/01/m1").await.is_ok());
    }

    #[tokio::test]
    async fn cascade_deletes_attachments_before_messages() {
        let mut j = job();
        approve(&mut j, "admin1");
        let store = InMemoryStore::new();
        store.put("att1", Bytes::from_static(b"x"), PutOptions::default()).await.unwrap();
        store.put("msg1", Bytes::from_static(b"x"), PutOptions::default()).await.unwrap();
        let targets = vec![
            DeletionTarget {
                kind: TargetKind::Message,
                storage_key: "msg1".into(),
                domain_id: "example.com".into(),
                user_id: Some("user1".into()),
                indexed_terms: vec![],
            },
            DeletionTarget {
                kind: TargetKind::Attachment,
                storage_key: "att1".into(),
                domain_id: "example.com".into(),
                user_id: Some("user1".into()),
                indexed_terms: vec![],
            },
        ];
        let mut audit = Vec::new();
        let outcome = execute(&mut j, targets, &[], "org1", Utc::now(), &store, &mut audit).await.unwrap();
        assert_eq!(outcome.deleted, vec!["att1".to_string(), "msg1".to_string()]);
        assert_eq!(j.status, JobStatus::Completed);
    }
}
