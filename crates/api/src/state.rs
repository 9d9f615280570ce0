//! Shared application state handed to every request handler, mirroring the
//! teacher's `Server`/`Inner` wiring: one `Arc<AppState>` cloned per
//! connection rather than a global.

use common::job::{DeletionAuditEntry, DeletionJob, ExportJob};
use common::{LegalHold, RetentionPolicy};
use dashmap::DashMap;
use dedup::DedupIndex;
use jobs::LeaseTable;
use llm_router::ProviderRouter;
use parking_lot::RwLock;
use quota::QuotaEngine;
use std::sync::Arc;
use store::ObjectStore;

pub struct AppState {
    pub object_store: Arc<dyn ObjectStore>,
    pub dedup: Arc<DedupIndex>,
    pub quota: Arc<QuotaEngine>,
    pub leases: Arc<LeaseTable>,
    pub provider_router: Arc<ProviderRouter>,
    pub export_jobs: DashMap<String, ExportJob>,
    pub deletion_jobs: DashMap<String, DeletionJob>,
    pub deletion_audit: RwLock<Vec<DeletionAuditEntry>>,
    pub legal_holds: RwLock<Vec<LegalHold>>,
    pub retention_policies: RwLock<Vec<RetentionPolicy>>,
}

impl AppState {
    pub fn new(object_store: Arc<dyn ObjectStore>, provider_router: Arc<ProviderRouter>) -> Self {
        AppState {
            object_store,
            dedup: Arc::new(DedupIndex::new()),
            quota: Arc::new(QuotaEngine::new()),
            leases: Arc::new(LeaseTable::new(chrono::Duration::seconds(30))),
            provider_router,
            export_jobs: DashMap::new(),
            deletion_jobs: DashMap::new(),
            deletion_audit: RwLock::new(Vec::new()),
            legal_holds: RwLock::new(Vec::new()),
            retention_policies: RwLock::new(Vec::new()),
        }
    }
}
