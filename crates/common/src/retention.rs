//! Retention policy and legal-hold records (§3, §4.D).

use crate::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RetentionAction {
    Delete,
    Archive,
}

#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub id: String,
    pub domain_id: String,
    /// Either a folder *type* (e.g. "Inbox") or a specific `folderId`; the
    /// evaluator matches whichever is populated.
    pub folder_type: Option<String>,
    pub folder_id: Option<String>,
    /// `0` means "no expiry" (§3).
    pub retention_days: u32,
    pub action: RetentionAction,
    pub enabled: bool,
    /// Higher priority wins ties per folder (§4.D).
    pub priority: i32,
    pub exclude_starred: bool,
    pub exclude_labels: Vec<String>,
}

impl RetentionPolicy {
    pub fn has_expiry(&self) -> bool {
        self.retention_days > 0
    }

    pub fn matches_folder(&self, folder_id: &str, folder_type: &str) -> bool {
        match (&self.folder_id, &self.folder_type) {
            (Some(id), _) => id == folder_id,
            (None, Some(ty)) => ty.eq_ignore_ascii_case(folder_type),
            (None, None) => false,
        }
    }

    pub fn expiry_at(&self, created_at: Timestamp) -> Option<Timestamp> {
        self.has_expiry()
            .then(|| created_at + chrono::Duration::days(self.retention_days as i64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LegalHoldScope {
    Org,
    Domain,
    User,
}

#[derive(Debug, Clone)]
pub struct LegalHold {
    pub id: String,
    pub scope: LegalHoldScope,
    /// The id of the org/domain/user this hold covers, per `scope`.
    pub scope_id: String,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub keywords: Option<Vec<String>>,
    pub active: bool,
}

impl LegalHold {
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.active && now >= self.start_date && self.end_date.map_or(true, |end| now <= end)
    }

    /// `exists active LegalHold h where h.scope covers object AND
    /// (h.keywords empty OR any keyword appears in metadata subject/body-indexed
    /// terms)` (§4.D). `indexed_terms` should include the subject and any
    /// body-indexed terms the caller has available; an empty keyword list
    /// matches unconditionally.
    pub fn covers(&self, now: Timestamp, indexed_terms: &[String]) -> bool {
        if !self.is_active_at(now) {
            return false;
        }
        match &self.keywords {
            None => true,
            Some(keywords) if keywords.is_empty() => true,
            Some(keywords) => keywords
                .iter()
                .any(|k| indexed_terms.iter().any(|t| t.eq_ignore_ascii_case(k))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ComplianceType {
    Gdpr,
    Retention,
    Legal,
    Manual,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(keywords: Option<Vec<String>>, start_offset_days: i64) -> LegalHold {
        LegalHold {
            id: "h1".into(),
            scope: LegalHoldScope::User,
            scope_id: "u1".into(),
            start_date: crate::now() - chrono::Duration::days(start_offset_days),
            end_date: None,
            keywords,
            active: true,
        }
    }

    #[test]
    fn hold_covers_objects_older_than_start_date_while_active() {
        let h = hold(None, 10);
        assert!(h.is_active_at(crate::now()));
        assert!(h.covers(crate::now(), &[]));
    }

    #[test]
    fn empty_keywords_matches_unconditionally() {
        let h = hold(Some(vec![]), 1);
        assert!(h.covers(crate::now(), &["anything".into()]));
    }

    #[test]
    fn keyword_hold_requires_intersection() {
        let h = hold(Some(vec!["litigation".into()]), 1);
        assert!(!h.covers(crate::now(), &["unrelated".into()]));
        assert!(h.covers(crate::now(), &["Litigation".into()]));
    }

    #[test]
    fn retention_days_zero_means_no_expiry() {
        let p = RetentionPolicy {
            id: "p1".into(),
            domain_id: "d1".into(),
            folder_type: Some("Inbox".into()),
            folder_id: None,
            retention_days: 0,
            action: RetentionAction::Delete,
            enabled: true,
            priority: 0,
            exclude_starred: false,
            exclude_labels: vec![],
        };
        assert!(!p.has_expiry());
        assert_eq!(p.expiry_at(crate::now()), None);
    }
}
