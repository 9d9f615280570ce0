//! Export and deletion job records (§3, §4.E, §4.F). The audit trail
//! references the job id only; there is no back-pointer from the job into
//! its audit entries (§9: retrieved by query, not embedded).

use crate::{retention::ComplianceType, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExportFormat {
    Mbox,
    Pst,
    Eml,
    Json,
}

#[derive(Debug, Clone)]
pub enum ExportSelector {
    UserIds(Vec<String>),
    MailboxIds(Vec<String>),
    Query(String),
    DateRange { from: Timestamp, to: Timestamp },
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    pub id: String,
    pub domain_id: String,
    pub format: ExportFormat,
    pub selector: ExportSelector,
    pub compress: bool,
    pub encrypt: bool,
    pub public_key: Option<String>,
    pub requested_by: String,
    pub reason: String,
    pub status: JobStatus,
    /// `[0..1]`.
    pub progress: f32,
    pub output_key: Option<String>,
    pub requested_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    /// Cooperative cancellation flag checked between objects (§4.E).
    pub cancel_requested: bool,
    pub lease: Option<JobLease>,
}

impl ExportJob {
    /// Valid transitions per §4.E's state machine.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self.status, next),
            (Pending, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Pending, Cancelled)
                | (Running, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DeletionJobType {
    Domain,
    User,
    Mailbox,
    Selective,
}

#[derive(Debug, Clone)]
pub struct DeletionJob {
    pub id: String,
    pub domain_id: String,
    pub job_type: DeletionJobType,
    /// Object refs (message/attachment/mailbox ids) this job targets; empty
    /// for whole-domain/user jobs where the worker enumerates targets itself.
    pub target_refs: Vec<String>,
    pub compliance_type: ComplianceType,
    pub reason: String,
    pub requested_by: String,
    pub requires_approval: bool,
    pub approved_by: Option<String>,
    pub scheduled_for: Option<Timestamp>,
    pub status: JobStatus,
    pub lease: Option<JobLease>,
}

impl DeletionJob {
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        if self.requires_approval && self.approved_by.is_none() {
            return matches!((self.status, next), (Pending, Cancelled));
        }
        matches!(
            (self.status, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    pub fn is_approved(&self) -> bool {
        !self.requires_approval || self.approved_by.is_some()
    }
}

/// The CAS-backed lease record (ADDED, §5/§9: "scoped resources with
/// guaranteed release on all exit paths").
#[derive(Debug, Clone)]
pub struct JobLease {
    pub job_id: String,
    pub worker_id: String,
    pub heartbeat_at: Timestamp,
}

impl JobLease {
    pub fn is_stale(&self, heartbeat_interval: chrono::Duration, now: Timestamp) -> bool {
        now - self.heartbeat_at > heartbeat_interval * 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DeletionAuditEvent {
    Created,
    Approved,
    Started,
    ObjectDeleted,
    SkippedHold,
    Finished,
    Cancelled,
}

/// Append-only; retrieved by query against `job_id`, never embedded in the job.
#[derive(Debug, Clone)]
pub struct DeletionAuditEntry {
    pub job_id: String,
    pub at: Timestamp,
    pub actor: String,
    pub event: DeletionAuditEvent,
    pub detail: String,
}
