//! Retention policy evaluation and sweep (§4.D). This crate only decides
//! *what* should happen to an object; it never deletes or archives anything
//! itself — [`DeletionJob`](common::DeletionJob)/export workers in the
//! `jobs` crate act on the [`SweepAction`]s this produces, which keeps
//! `retention` from depending on `jobs` (the deletion worker re-checks
//! holds at execution time through this same crate instead).

use chrono::{DateTime, Utc};
use common::{LegalHold, MessageMetadata, RetentionAction, RetentionPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No enabled policy matches this object's folder.
    NoPolicy,
    /// A policy matches but has no expiry (`retention_days == 0`).
    Retain,
    /// A policy matches and has an expiry, but it hasn't passed yet.
    NotYetDue { policy_id: String, expires_at_secs: i64 },
    /// An active legal hold suppresses the otherwise-due action.
    LegalHold { hold_id: String },
    /// The object is due for `action` under `policy_id`.
    Act { policy_id: String, action: RetentionAction },
}

/// Picks the policy that governs a folder when more than one matches:
/// highest `priority` wins; ties break toward the stricter (shorter)
/// retention window, then by id for determinism (§4.D: "conflict resolution
/// must be deterministic and favor the more conservative outcome").
fn select_policy<'p>(policies: &'p [RetentionPolicy], folder_id: &str, folder_type: &str) -> Option<&'p RetentionPolicy> {
    policies
        .iter()
        .filter(|p| p.enabled && p.matches_folder(folder_id, folder_type))
        .max_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.retention_days.cmp(&a.retention_days))
                .then_with(|| b.id.cmp(&a.id))
        })
}

/// Finds the first active hold covering the given scope, if any. Exposed so
/// the deletion worker can re-check holds at execution time without this
/// crate depending on `jobs` (§4.F: "re-check legal holds immediately before
/// deleting, not just at job creation time").
pub fn find_covering_hold(
    holds: &[LegalHold],
    org_id: &str,
    domain_id: &str,
    user_id: Option<&str>,
    now: DateTime<Utc>,
    indexed_terms: &[String],
) -> Option<String> {
    held_by(holds, org_id, domain_id, user_id, now, indexed_terms)
}

fn held_by(
    holds: &[LegalHold],
    org_id: &str,
    domain_id: &str,
    user_id: Option<&str>,
    now: DateTime<Utc>,
    indexed_terms: &[String],
) -> Option<String> {
    holds
        .iter()
        .find(|h| {
            let scope_matches = match h.scope {
                common::LegalHoldScope::Org => h.scope_id == org_id,
                common::LegalHoldScope::Domain => h.scope_id == domain_id,
                common::LegalHoldScope::User => Some(h.scope_id.as_str()) == user_id,
            };
            scope_matches && h.covers(now, indexed_terms)
        })
        .map(|h| h.id.clone())
}

/// Evaluates the retention decision for a single message. `indexed_terms`
/// should include the subject and any body-indexed terms available to the
/// caller (§4.D keyword-hold predicate).
pub fn evaluate(
    message: &MessageMetadata,
    policies: &[RetentionPolicy],
    holds: &[LegalHold],
    org_id: &str,
    indexed_terms: &[String],
    now: DateTime<Utc>,
) -> Decision {
    let Some(policy) = select_policy(policies, &message.folder_id, &message.folder_id) else {
        return Decision::NoPolicy;
    };
    if policy.exclude_starred && message.is_starred() {
        return Decision::Retain;
    }
    if !policy.exclude_labels.is_empty() && message.has_any_label(&policy.exclude_labels) {
        return Decision::Retain;
    }
    if !policy.has_expiry() {
        return Decision::Retain;
    }
    let expires_at = policy.expiry_at(message.created_at).expect("has_expiry checked above");
    if now < expires_at {
        return Decision::NotYetDue {
            policy_id: policy.id.clone(),
            expires_at_secs: expires_at.timestamp(),
        };
    }
    if let Some(hold_id) = held_by(
        holds,
        org_id,
        &message.scope.domain_id,
        message.scope.user_id.as_deref(),
        now,
        indexed_terms,
    ) {
        return Decision::LegalHold { hold_id };
    }
    Decision::Act {
        policy_id: policy.id.clone(),
        action: policy.action,
    }
}

/// One sweep result for a batch of messages; the caller (an export/deletion
/// worker) groups these by `action` and dispatches accordingly.
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub message_id: String,
    pub decision: Decision,
}

pub fn sweep(
    messages: &[MessageMetadata],
    policies: &[RetentionPolicy],
    holds: &[LegalHold],
    org_id: &str,
    indexed_terms_for: impl Fn(&MessageMetadata) -> Vec<String>,
    now: DateTime<Utc>,
) -> Vec<SweepResult> {
    messages
        .iter()
        .map(|m| SweepResult {
            message_id: m.message_id.clone(),
            decision: evaluate(m, policies, holds, org_id, &indexed_terms_for(m), now),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::key::Scope;

    fn message(folder_id: &str, created_at: DateTime<Utc>, flags: Vec<String>) -> MessageMetadata {
        MessageMetadata {
            scope: Scope::user("org1", "example.com", "user1"),
            mailbox_id: "mbox1".into(),
            folder_id: folder_id.into(),
            message_id: "msg1".into(),
            subject: "hello".into(),
            from: "a@example.com".into(),
            to: vec!["b@example.com".into()],
            date: created_at,
            size: 100,
            has_attachments: false,
            flags,
            created_at,
            updated_at: created_at,
        }
    }

    fn policy(id: &str, priority: i32, retention_days: u32, action: RetentionAction) -> RetentionPolicy {
        RetentionPolicy {
            id: id.into(),
            domain_id: "example.com".into(),
            folder_type: None,
            folder_id: Some("inbox".into()),
            retention_days,
            action,
            enabled: true,
            priority,
            exclude_starred: false,
            exclude_labels: vec![],
        }
    }

    #[test]
    fn no_matching_policy_means_no_policy() {
        let now = Utc::now();
        let m = message("inbox", now - chrono::Duration::days(400), vec![]);
        let decision = evaluate(&m, &[], &[], "org1", &[], now);
        assert_eq!(decision, Decision::NoPolicy);
    }

    #[test]
    fn higher_priority_policy_wins_on_conflict() {
        let now = Utc::now();
        let created = now - chrono::Duration::days(400);
        let m = message("inbox", created, vec![]);
        let policies = vec![
            policy("p-low", 1, 90, RetentionAction::Archive),
            policy("p-high", 5, 30, RetentionAction::Delete),
        ];
        let decision = evaluate(&m, &policies, &[], "org1", &[], now);
        assert_eq!(
            decision,
            Decision::Act {
                policy_id: "p-high".into(),
                action: RetentionAction::Delete,
            }
        );
    }

    #[test]
    fn not_yet_expired_is_reported_as_not_due() {
        let now = Utc::now();
        let created = now - chrono::Duration::days(10);
        let m = message("inbox", created, vec![]);
        let policies = vec![policy("p1", 1, 90, RetentionAction::Delete)];
        match evaluate(&m, &policies, &[], "org1", &[], now) {
            Decision::NotYetDue { .. } => {}
            other => panic!("expected NotYetDue, got {other:?}"),
        }
    }

    #[test]
    fn active_legal_hold_suppresses_an_otherwise_due_action() {
        let now = Utc::now();
        let created = now - chrono::Duration::days(400);
        let m = message("inbox", created, vec![]);
        let policies = vec![policy("p1", 1, 90, RetentionAction::Delete)];
        let holds = vec![LegalHold {
            id: "hold1".into(),
            scope: common::LegalHoldScope::User,
            scope_id: "user1".into(),
            start_date: now - chrono::Duration::days(500),
            end_date: None,
            keywords: None,
            active: true,
        }];
        assert_eq!(
            evaluate(&m, &policies, &holds, "org1", &[], now),
            Decision::LegalHold { hold_id: "hold1".into() }
        );
    }

    #[test]
    fn starred_messages_are_excluded_when_policy_says_so() {
        let now = Utc::now();
        let created = now - chrono::Duration::days(400);
        let m = message("inbox", created, vec!["starred".into()]);
        let mut p = policy("p1", 1, 90, RetentionAction::Delete);
        p.exclude_starred = true;
        assert_eq!(evaluate(&m, &[p], &[], "org1", &[], now), Decision::Retain);
    }
}
