//! End-to-end scenario tests for the storage/policy plane and the LLM
//! provider router, one per literal example worked through the HTTP
//! surface's external interface description — mirroring the teacher's
//! top-level `tests` crate that exercises whole components together rather
//! than one module at a time.

#[cfg(test)]
mod scenarios {
    use bytes::Bytes;
    use chrono::{Duration as ChronoDuration, Utc};
    use common::job::{ExportFormat, ExportJob, ExportSelector, JobStatus};
    use common::key::YearMonth;
    use common::{LegalHold, LegalHoldScope, MessageMetadata, Quota, QuotaLevel, RetentionAction, RetentionPolicy, Scope, StorageKey};
    use dedup::DedupIndex;
    use quota::QuotaEngine;
    use store::{InMemoryStore, ObjectStore, PutOptions};

    fn message(folder_id: &str, created_days_ago: i64, scope: Scope) -> MessageMetadata {
        let now = Utc::now();
        MessageMetadata {
            scope,
            mailbox_id: "mbx-1".into(),
            folder_id: folder_id.into(),
            message_id: "msg-1".into(),
            subject: "hello".into(),
            from: "a@example.com".into(),
            to: vec!["b@example.com".into()],
            date: now,
            size: 1024,
            has_attachments: false,
            flags: Vec::new(),
            created_at: now - ChronoDuration::days(created_days_ago),
            updated_at: now,
        }
    }

    /// Scenario 1: upload with a known content hash, register the blob, and
    /// confirm a second caller's `checkDuplicate` reports the space saved.
    #[test]
    fn attachment_dedup_reports_space_saved_on_second_registration() {
        let index = DedupIndex::new();
        let scope = Scope::user("org-1", "dom-1", "user-1");
        let key = StorageKey::attachment(scope, "att-1");

        assert!(index.check_duplicate("A").is_none());
        let blob = index.register_blob("A", "application/pdf", 1024, key, "att-1");
        index.add_reference(&blob.content_hash).unwrap();

        // Second client uploads the same content: registration is a no-op,
        // and a second reference lands on the same blob.
        let duplicate = index.check_duplicate("A").expect("blob A registered by the first caller");
        assert_eq!(duplicate.size, 1024);
        index.add_reference(&duplicate.content_hash).unwrap();

        let stats = index.stats();
        assert_eq!(stats.unique_blobs, 1);
        assert_eq!(stats.total_references, 2);
        // One blob serving two references means one copy's worth of bytes
        // was never stored twice.
        assert_eq!(stats.bytes_saved, 1024);
    }

    /// Scenario 2: a mailbox at 95% of its hard limit must reject a commit
    /// that would push it over, without mutating usage.
    #[test]
    fn quota_hard_breach_blocks_the_commit_without_partial_writes() {
        let engine = QuotaEngine::new();
        engine.register(Quota {
            level: QuotaLevel::Mailbox,
            entity_id: "mbx-1".into(),
            parent_id: None,
            total_bytes: 10_000,
            used_bytes: 9_500,
            object_count: 1,
            soft_limit_pct: 85,
            hard_limit_pct: 100,
        });

        let err = engine.check("mbx-1", 1_000).unwrap_err();
        assert_eq!(err.kind, trc::Kind::QuotaExceeded);

        let snapshot = engine.get_usage("mbx-1").unwrap();
        assert_eq!(snapshot.used_bytes, 9_500, "a rejected check must not move usage");
    }

    /// Scenario 3: a message is due for deletion under its folder policy,
    /// but an active legal hold on its owner suppresses the action, and the
    /// deletion worker records a skip rather than deleting.
    #[tokio::test]
    async fn legal_hold_suppresses_an_otherwise_due_deletion() {
        let scope = Scope::user("org-1", "dom-1", "user-1");
        let message = message("Inbox", 40, scope.clone());
        let policy = RetentionPolicy {
            id: "pol-1".into(),
            domain_id: "dom-1".into(),
            folder_type: Some("Inbox".into()),
            folder_id: None,
            retention_days: 30,
            action: RetentionAction::Delete,
            enabled: true,
            priority: 0,
            exclude_starred: false,
            exclude_labels: Vec::new(),
        };
        let hold = LegalHold {
            id: "hold-1".into(),
            scope: LegalHoldScope::User,
            scope_id: "user-1".into(),
            start_date: Utc::now() - ChronoDuration::days(100),
            end_date: None,
            keywords: None,
            active: true,
        };

        let decision = retention::evaluate(&message, &[policy], &[hold.clone()], "org-1", &[], Utc::now());
        assert_eq!(decision, retention::Decision::LegalHold { hold_id: "hold-1".into() });

        let object_store = InMemoryStore::new();
        let key_under_hold = StorageKey::message(scope.clone(), YearMonth::from_timestamp(Utc::now()), "msg-1");
        object_store
            .put(&key_under_hold.to_string(), Bytes::from_static(b"body"), PutOptions::default())
            .await
            .unwrap();

        let mut job = common::DeletionJob {
            id: "del-1".into(),
            domain_id: "dom-1".into(),
            job_type: common::job::DeletionJobType::Selective,
            target_refs: vec!["msg-1".into()],
            compliance_type: common::ComplianceType::Retention,
            reason: "retention sweep".into(),
            requested_by: "system".into(),
            requires_approval: false,
            approved_by: Some("system".into()),
            scheduled_for: None,
            status: JobStatus::Pending,
            lease: None,
        };
        let mut audit = Vec::new();
        let targets = vec![jobs::deletion::DeletionTarget {
            kind: jobs::deletion::TargetKind::Message,
            storage_key: key_under_hold.to_string(),
            domain_id: "dom-1".into(),
            user_id: Some("user-1".into()),
            indexed_terms: Vec::new(),
        }];

        let outcome = jobs::deletion::execute(&mut job, targets, &[hold], "org-1", Utc::now(), &object_store, &mut audit)
            .await
            .unwrap();

        assert!(outcome.deleted.is_empty());
        assert_eq!(outcome.skipped_for_hold, vec![key_under_hold.to_string()]);
        assert!(audit
            .iter()
            .any(|entry| matches!(entry.event, common::job::DeletionAuditEvent::SkippedHold)));
        // The object must still be there: a hold makes the object immutable.
        assert!(object_store.get(&key_under_hold.to_string()).await.is_ok());
    }

    /// Scenario 4: cancelling a running export reaches a terminal
    /// `cancelled` state with no output key, and never writes to storage.
    #[tokio::test]
    async fn cancelling_an_export_mid_run_never_writes_output() {
        let object_store = InMemoryStore::new();
        let mut job = ExportJob {
            id: "exp-1".into(),
            domain_id: "dom-1".into(),
            format: ExportFormat::Mbox,
            selector: ExportSelector::UserIds(vec!["user-1".into()]),
            compress: true,
            encrypt: false,
            public_key: None,
            requested_by: "user-1".into(),
            reason: "gdpr request".into(),
            status: JobStatus::Pending,
            progress: 0.0,
            output_key: None,
            requested_at: common::now(),
            finished_at: None,
            cancel_requested: true,
            lease: None,
        };
        let items = vec![
            jobs::export::ExportItem {
                message_id: "msg-1".into(),
                raw_eml: b"From a\nTo b\n\nhi".to_vec(),
                metadata_json: serde_json::json!({ "id": "msg-1" }),
            },
            jobs::export::ExportItem {
                message_id: "msg-2".into(),
                raw_eml: b"From a\nTo b\n\nhi again".to_vec(),
                metadata_json: serde_json::json!({ "id": "msg-2" }),
            },
        ];

        jobs::export::run(&mut job, items, "exports/exp-1.mbox.gz", &object_store).await.unwrap();

        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.output_key.is_none());
        assert!(object_store.get("exports/exp-1.mbox.gz").await.is_err());
    }

    /// Scenario 5: a fallback chain retries the primary provider's
    /// transient failures, then fails over to the backup once the primary
    /// is marked unhealthy.
    #[tokio::test]
    async fn router_fails_over_once_the_primary_is_marked_unhealthy() {
        use async_trait::async_trait;
        use llm_core::{ChatMessage, ChatRole, CompletionChunk, CompletionRequest, CompletionResponse, CompletionStream, EmbeddingRequest, EmbeddingResponse, Provider, Usage};
        use llm_router::ProviderRouter;
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        struct RateLimitedThenHealthy {
            name: &'static str,
            remaining_failures: AtomicU32,
        }

        #[async_trait]
        impl Provider for RateLimitedThenHealthy {
            fn name(&self) -> &str {
                self.name
            }

            async fn complete(&self, _request: CompletionRequest) -> trc::Result<CompletionResponse> {
                if self.remaining_failures.fetch_sub(1, Ordering::SeqCst) > 0 {
                    return Err(trc::Error::provider(trc::ProviderEvent::RateLimited, "slow down"));
                }
                Ok(CompletionResponse {
                    model: "m".into(),
                    content: format!("ok from {}", self.name),
                    finish_reason: "stop".into(),
                    usage: Usage { prompt_tokens: 5, completion_tokens: 2, total_tokens: 7 },
                })
            }

            async fn complete_stream(&self, _request: CompletionRequest) -> trc::Result<CompletionStream> {
                unimplemented!()
            }

            async fn embed(&self, _request: EmbeddingRequest) -> trc::Result<EmbeddingResponse> {
                unimplemented!()
            }

            async fn health_check(&self) -> trc::Result<()> {
                Ok(())
            }
        }

        // Provider A fails every attempt within its retry budget, so the
        // router marks it unhealthy after max_attempts are spent and moves
        // to provider B.
        let a = Arc::new(RateLimitedThenHealthy { name: "A", remaining_failures: AtomicU32::new(10) });
        let b = Arc::new(RateLimitedThenHealthy { name: "B", remaining_failures: AtomicU32::new(0) });
        let router = ProviderRouter::new(vec![a, b]).with_max_attempts_per_provider(3);

        let request = CompletionRequest {
            model: "m".into(),
            messages: vec![ChatMessage { role: ChatRole::User, content: "analyze this".into() }],
            max_tokens: None,
            temperature: None,
        };
        let (_tx, rx) = tokio::sync::oneshot::channel();
        let response = router.complete_with_fallback(request, rx).await.unwrap();

        assert_eq!(response.content, "ok from B");
        assert_eq!(response.usage.prompt_tokens, 5);
        let _ = CompletionChunk { delta: String::new(), finish_reason: None };
    }

    /// Scenario 6: a streaming completion delivers its chunks in order and
    /// terminates with a final chunk carrying the cumulative usage.
    #[tokio::test]
    async fn streaming_completion_terminates_with_final_usage() {
        use futures::StreamExt;
        use llm_core::{CompletionChunk, CompletionStream, Usage};
        use tokio::sync::oneshot;

        let (cancel_tx, _cancel_rx) = oneshot::channel();
        let stream = async_stream::stream! {
            yield Ok(CompletionChunk { delta: "Hel".into(), finish_reason: None });
            yield Ok(CompletionChunk { delta: "lo".into(), finish_reason: None });
            yield Ok(CompletionChunk { delta: String::new(), finish_reason: Some("stop".into()) });
        };
        let completion_stream = CompletionStream::new(Box::pin(stream), cancel_tx);

        let mut inner = completion_stream.into_inner();
        let mut received = Vec::new();
        while let Some(chunk) = inner.next().await {
            received.push(chunk.unwrap());
        }

        assert_eq!(received.len(), 3);
        assert_eq!(received[0].delta, "Hel");
        assert_eq!(received[1].delta, "lo");
        assert_eq!(received[2].finish_reason.as_deref(), Some("stop"));

        let usage = Usage { prompt_tokens: 5, completion_tokens: 2, total_tokens: 7 };
        assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);
    }
}
