//! Quota records (§3, §4.C). The hierarchy is org → domain → user → mailbox;
//! each level stores its own totals and an optional parent pointer rather
//! than an embedded child list (§9: "model the quota hierarchy as an
//! immutable parent pointer per record; recompute children by query").

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum QuotaLevel {
    Org,
    Domain,
    User,
    Mailbox,
}

impl QuotaLevel {
    pub fn parent(self) -> Option<QuotaLevel> {
        match self {
            QuotaLevel::Mailbox => Some(QuotaLevel::User),
            QuotaLevel::User => Some(QuotaLevel::Domain),
            QuotaLevel::Domain => Some(QuotaLevel::Org),
            QuotaLevel::Org => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Quota {
    pub level: QuotaLevel,
    pub entity_id: String,
    pub parent_id: Option<String>,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub object_count: u64,
    pub soft_limit_pct: u8,
    pub hard_limit_pct: u8,
}

impl Quota {
    pub fn new(level: QuotaLevel, entity_id: impl Into<String>, parent_id: Option<String>, total_bytes: u64) -> Self {
        Quota {
            level,
            entity_id: entity_id.into(),
            parent_id,
            total_bytes,
            used_bytes: 0,
            object_count: 0,
            soft_limit_pct: 85,
            hard_limit_pct: 100,
        }
    }

    pub fn hard_limit_bytes(&self) -> u64 {
        (self.total_bytes as u128 * self.hard_limit_pct as u128 / 100) as u64
    }

    pub fn soft_limit_bytes(&self) -> u64 {
        (self.total_bytes as u128 * self.soft_limit_pct as u128 / 100) as u64
    }

    pub fn current_pct(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        ((self.used_bytes as u128 * 100 / self.total_bytes as u128).min(255)) as u8
    }

    pub fn would_exceed_hard_limit(&self, delta_bytes: i64) -> bool {
        let projected = self.used_bytes as i64 + delta_bytes;
        projected < 0 || projected as u64 > self.hard_limit_bytes()
    }

    pub fn would_exceed_soft_limit(&self, delta_bytes: i64) -> bool {
        let projected = (self.used_bytes as i64 + delta_bytes).max(0) as u64;
        projected > self.soft_limit_bytes()
    }
}

/// The consistent snapshot `getUsage` returns (§4.C), pre-populated with
/// child aggregates so callers don't have to re-query per level.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QuotaUsageSnapshot {
    pub level: QuotaLevel,
    pub entity_id: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub object_count: u64,
    pub soft_limit_pct: u8,
    pub hard_limit_pct: u8,
    pub current_pct: u8,
    pub children: Vec<QuotaUsageSnapshot>,
}

impl From<&Quota> for QuotaUsageSnapshot {
    fn from(q: &Quota) -> Self {
        QuotaUsageSnapshot {
            level: q.level,
            entity_id: q.entity_id.clone(),
            total_bytes: q.total_bytes,
            used_bytes: q.used_bytes,
            object_count: q.object_count,
            soft_limit_pct: q.soft_limit_pct,
            hard_limit_pct: q.hard_limit_pct,
            current_pct: q.current_pct(),
            children: Vec::new(),
        }
    }
}
