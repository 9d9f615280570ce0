//! Hierarchical quota engine (§4.C). The hierarchy is mailbox → user →
//! domain → org; `commit` walks from the leaf up to the root and applies
//! the delta to every level or none of them.
//!
//! Multi-level commits are serialized behind a single [`parking_lot::Mutex`]
//! rather than per-entity locks acquired in hierarchy order: at this scale a
//! global commit lock is simpler to reason about than a lock-ordering
//! protocol, and commits are short (a handful of integer adds).

use common::{Quota, QuotaLevel, QuotaUsageSnapshot};
use dashmap::DashMap;
use parking_lot::Mutex;

pub struct QuotaEngine {
    quotas: DashMap<String, Quota>,
    commit_lock: Mutex<()>,
}

impl QuotaEngine {
    pub fn new() -> Self {
        QuotaEngine {
            quotas: DashMap::new(),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn register(&self, quota: Quota) {
        self.quotas.insert(quota.entity_id.clone(), quota);
    }

    pub fn get(&self, entity_id: &str) -> Option<Quota> {
        self.quotas.get(entity_id).map(|q| q.clone())
    }

    /// The chain from `entity_id` up to the root, leaf first.
    fn chain(&self, entity_id: &str) -> trc::Result<Vec<String>> {
        let mut chain = Vec::new();
        let mut current = entity_id.to_string();
        loop {
            let quota = self
                .quotas
                .get(&current)
                .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "quota entity not registered"))?;
            chain.push(current.clone());
            match &quota.parent_id {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }
        Ok(chain)
    }

    /// Read-only check: would applying `delta_bytes` at `entity_id` breach a
    /// hard limit anywhere in the chain up to the root? (§4.C: "check and
    /// commit must walk the same chain").
    pub fn check(&self, entity_id: &str, delta_bytes: i64) -> trc::Result<()> {
        for id in self.chain(entity_id)? {
            let quota = self.quotas.get(&id).expect("chain entries are registered");
            if quota.would_exceed_hard_limit(delta_bytes) {
                return Err(trc::Error::quota(
                    trc::QuotaEvent::HardLimitExceeded,
                    format!("quota hard limit exceeded at {} ({})", quota.level_label(), id),
                ));
            }
        }
        Ok(())
    }

    /// Applies `delta_bytes`/`delta_objects` to every level in the chain
    /// atomically: either every level is updated, or (on a hard-limit
    /// breach) none are.
    pub fn commit(&self, entity_id: &str, delta_bytes: i64, delta_objects: i64) -> trc::Result<Vec<Quota>> {
        let _guard = self.commit_lock.lock();
        self.check(entity_id, delta_bytes)?;
        let chain = self.chain(entity_id)?;
        let mut updated = Vec::with_capacity(chain.len());
        for id in &chain {
            let mut quota = self.quotas.get_mut(id).expect("chain entries are registered");
            quota.used_bytes = (quota.used_bytes as i64 + delta_bytes).max(0) as u64;
            quota.object_count = (quota.object_count as i64 + delta_objects).max(0) as u64;
            updated.push(quota.clone());
        }
        Ok(updated)
    }

    /// `getUsage`: a consistent snapshot of `entity_id` with its direct
    /// children's usage nested underneath.
    pub fn get_usage(&self, entity_id: &str) -> trc::Result<QuotaUsageSnapshot> {
        let quota = self
            .quotas
            .get(entity_id)
            .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "quota entity not registered"))?;
        let mut snapshot = QuotaUsageSnapshot::from(&*quota);
        snapshot.children = self
            .quotas
            .iter()
            .filter(|e| e.value().parent_id.as_deref() == Some(entity_id))
            .map(|e| QuotaUsageSnapshot::from(e.value()))
            .collect();
        Ok(snapshot)
    }

    /// Corrects drift between tracked and actual usage. Only ever *lowers*
    /// `used_bytes`/`object_count` (§4.C reconciler invariant: a reconcile
    /// pass must never increase what a tenant is charged for, since an
    /// upward correction could spuriously trip a hard limit the tenant
    /// never actually crossed).
    pub fn recompute(&self, entity_id: &str, actual_bytes: u64, actual_objects: u64) -> trc::Result<Quota> {
        let mut quota = self
            .quotas
            .get_mut(entity_id)
            .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "quota entity not registered"))?;
        if actual_bytes < quota.used_bytes {
            quota.used_bytes = actual_bytes;
        }
        if actual_objects < quota.object_count {
            quota.object_count = actual_objects;
        }
        Ok(quota.clone())
    }
}

impl Default for QuotaEngine {
    fn default() -> Self {
        QuotaEngine::new()
    }
}

trait LevelLabel {
    fn level_label(&self) -> &'static str;
}

impl LevelLabel for Quota {
    fn level_label(&self) -> &'static str {
        match self.level {
            QuotaLevel::Org => "org",
            QuotaLevel::Domain => "domain",
            QuotaLevel::User => "user",
            QuotaLevel::Mailbox => "mailbox",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_chain(engine: &QuotaEngine, mailbox_total: u64, user_total: u64) {
        engine.register(Quota::new(QuotaLevel::Org, "org1", None, 1_000_000));
        engine.register(Quota::new(QuotaLevel::Domain, "dom1", Some("org1".into()), 500_000));
        engine.register(Quota::new(QuotaLevel::User, "user1", Some("dom1".into()), user_total));
        engine.register(Quota::new(QuotaLevel::Mailbox, "mbox1", Some("user1".into()), mailbox_total));
    }

    #[test]
    fn commit_applies_delta_to_every_level_in_chain() {
        let engine = QuotaEngine::new();
        build_chain(&engine, 10_000, 50_000);
        engine.commit("mbox1", 1_000, 1).unwrap();
        assert_eq!(engine.get("mbox1").unwrap().used_bytes, 1_000);
        assert_eq!(engine.get("user1").unwrap().used_bytes, 1_000);
        assert_eq!(engine.get("dom1").unwrap().used_bytes, 1_000);
        assert_eq!(engine.get("org1").unwrap().used_bytes, 1_000);
    }

    #[test]
    fn hard_breach_at_any_level_blocks_the_whole_commit() {
        let engine = QuotaEngine::new();
        build_chain(&engine, 10_000, 50_000);
        engine.commit("mbox1", 9_500, 1).unwrap();
        let err = engine.commit("mbox1", 1_000, 1).unwrap_err();
        assert_eq!(err.kind, trc::Kind::QuotaExceeded);
        assert_eq!(engine.get("user1").unwrap().used_bytes, 9_500);
    }

    #[test]
    fn reconcile_only_lowers_usage() {
        let engine = QuotaEngine::new();
        build_chain(&engine, 10_000, 50_000);
        engine.commit("mbox1", 5_000, 3).unwrap();
        let recomputed = engine.recompute("mbox1", 9_000, 5).unwrap();
        assert_eq!(recomputed.used_bytes, 5_000, "must not raise usage above tracked value");
        let recomputed = engine.recompute("mbox1", 2_000, 1).unwrap();
        assert_eq!(recomputed.used_bytes, 2_000);
    }

    #[test]
    fn get_usage_nests_direct_children() {
        let engine = QuotaEngine::new();
        build_chain(&engine, 10_000, 50_000);
        engine.commit("mbox1", 1_000, 1).unwrap();
        let snapshot = engine.get_usage("user1").unwrap();
        assert_eq!(snapshot.children.len(), 1);
        assert_eq!(snapshot.children[0].entity_id, "mbox1");
    }
}
