//! Request routing and handlers for the management HTTP surface (§6).
//! Deliberately a flat method+path match rather than a routing crate — the
//! surface is small enough that a trie or macro-based router would be
//! machinery for its own sake.

use crate::error::{error_response, json_response};
use crate::state::AppState;
use bytes::Bytes;
use common::job::{DeletionAuditEvent, DeletionJob, DeletionJobType, ExportFormat, ExportJob, ExportSelector, JobStatus};
use common::{ComplianceType, LegalHold, LegalHoldScope};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

pub type ApiResponse = Response<Full<Bytes>>;

async fn read_json(req: Request<Incoming>) -> trc::Result<serde_json::Value> {
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| trc::Error::resource(trc::ResourceEvent::BadParameters, "failed to read request body").details(e.to_string()))?
        .to_bytes();
    if body.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(&body)
        .map_err(|e| trc::Error::resource(trc::ResourceEvent::BadParameters, "malformed JSON body").details(e.to_string()))
}

pub async fn handle(req: Request<Incoming>, state: Arc<AppState>) -> ApiResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let result = match (&method, segments.as_slice()) {
        (&Method::GET, ["v1", "quotas", entity_id]) => get_quota(&state, entity_id),
        (&Method::POST, ["v1", "quotas", entity_id, "check"]) => check_quota(&state, entity_id, req).await,
        (&Method::POST, ["v1", "quotas", entity_id, "commit"]) => commit_quota(&state, entity_id, req).await,
        (&Method::GET, ["v1", "dedup", "stats"]) => Ok(json_response(StatusCode::OK, &state.dedup.stats())),
        (&Method::POST, ["v1", "exports"]) => create_export(&state, req).await,
        (&Method::GET, ["v1", "exports", job_id]) => get_export(&state, job_id),
        (&Method::POST, ["v1", "exports", job_id, "cancel"]) => cancel_export(&state, job_id),
        (&Method::POST, ["v1", "deletions"]) => create_deletion(&state, req).await,
        (&Method::POST, ["v1", "deletions", job_id, "approve"]) => approve_deletion(&state, job_id, req).await,
        (&Method::GET, ["v1", "deletions", job_id]) => get_deletion(&state, job_id),
        (&Method::POST, ["v1", "legal-holds"]) => create_legal_hold(&state, req).await,
        (&Method::GET, ["v1", "legal-holds"]) => Ok(json_response(StatusCode::OK, &*state.legal_holds.read())),
        _ => Err(trc::Error::resource(trc::ResourceEvent::NotFound, "no such route")),
    };

    result.unwrap_or_else(|err| error_response(&err))
}

fn get_quota(state: &AppState, entity_id: &str) -> trc::Result<ApiResponse> {
    let snapshot = state.quota.get_usage(entity_id)?;
    Ok(json_response(StatusCode::OK, &snapshot))
}

async fn check_quota(state: &AppState, entity_id: &str, req: Request<Incoming>) -> trc::Result<ApiResponse> {
    let body = read_json(req).await?;
    let delta_bytes = body["delta_bytes"].as_i64().unwrap_or(0);
    state.quota.check(entity_id, delta_bytes)?;
    Ok(json_response(StatusCode::OK, &serde_json::json!({ "ok": true })))
}

async fn commit_quota(state: &AppState, entity_id: &str, req: Request<Incoming>) -> trc::Result<ApiResponse> {
    let body = read_json(req).await?;
    let delta_bytes = body["delta_bytes"].as_i64().unwrap_or(0);
    let delta_objects = body["delta_objects"].as_i64().unwrap_or(0);
    let updated = state.quota.commit(entity_id, delta_bytes, delta_objects)?;
    Ok(json_response(StatusCode::OK, &updated))
}

fn new_job_id() -> String {
    utils::new_opaque_id()
}

async fn create_export(state: &AppState, req: Request<Incoming>) -> trc::Result<ApiResponse> {
    let body = read_json(req).await?;
    let format = match body["format"].as_str().unwrap_or("json") {
        "mbox" => ExportFormat::Mbox,
        "eml" => ExportFormat::Eml,
        "pst" => ExportFormat::Pst,
        _ => ExportFormat::Json,
    };
    let job = ExportJob {
        id: new_job_id(),
        domain_id: body["domain_id"].as_str().unwrap_or_default().to_string(),
        format,
        selector: ExportSelector::MailboxIds(vec![body["mailbox_id"].as_str().unwrap_or_default().to_string()]),
        compress: body["compress"].as_bool().unwrap_or(false),
        encrypt: body["encrypt"].as_bool().unwrap_or(false),
        public_key: body["public_key"].as_str().map(str::to_string),
        requested_by: body["requested_by"].as_str().unwrap_or("unknown").to_string(),
        reason: body["reason"].as_str().unwrap_or_default().to_string(),
        status: JobStatus::Pending,
        progress: 0.0,
        output_key: None,
        requested_at: common::now(),
        finished_at: None,
        cancel_requested: false,
        lease: None,
    };
    let id = job.id.clone();
    state.export_jobs.insert(id.clone(), job);
    Ok(json_response(StatusCode::ACCEPTED, &serde_json::json!({ "job_id": id })))
}

fn get_export(state: &AppState, job_id: &str) -> trc::Result<ApiResponse> {
    let job = state
        .export_jobs
        .get(job_id)
        .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "export job not found"))?;
    Ok(json_response(StatusCode::OK, &serde_json::json!({
        "id": job.id,
        "status": format!("{:?}", job.status),
        "progress": job.progress,
        "output_key": job.output_key,
    })))
}

fn cancel_export(state: &AppState, job_id: &str) -> trc::Result<ApiResponse> {
    let mut job = state
        .export_jobs
        .get_mut(job_id)
        .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "export job not found"))?;
    if job.status.is_terminal() {
        return Err(trc::Error::job(trc::JobEvent::InvalidTransition, "export job has already finished"));
    }
    job.cancel_requested = true;
    Ok(json_response(StatusCode::OK, &serde_json::json!({ "ok": true })))
}

async fn create_deletion(state: &AppState, req: Request<Incoming>) -> trc::Result<ApiResponse> {
    let body = read_json(req).await?;
    let job_type = match body["job_type"].as_str().unwrap_or("selective") {
        "domain" => DeletionJobType::Domain,
        "user" => DeletionJobType::User,
        "mailbox" => DeletionJobType::Mailbox,
        _ => DeletionJobType::Selective,
    };
    let compliance_type = match body["compliance_type"].as_str().unwrap_or("manual") {
        "gdpr" => ComplianceType::Gdpr,
        "retention" => ComplianceType::Retention,
        "legal" => ComplianceType::Legal,
        _ => ComplianceType::Manual,
    };
    let target_refs = body["target_refs"]
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let job = DeletionJob {
        id: new_job_id(),
        domain_id: body["domain_id"].as_str().unwrap_or_default().to_string(),
        job_type,
        target_refs,
        compliance_type,
        reason: body["reason"].as_str().unwrap_or_default().to_string(),
        requested_by: body["requested_by"].as_str().unwrap_or("unknown").to_string(),
        requires_approval: body["requires_approval"].as_bool().unwrap_or(true),
        approved_by: None,
        scheduled_for: None,
        status: JobStatus::Pending,
        lease: None,
    };
    let id = job.id.clone();
    state.deletion_audit.write().push(common::job::DeletionAuditEntry {
        job_id: id.clone(),
        at: common::now(),
        actor: job.requested_by.clone(),
        event: DeletionAuditEvent::Created,
        detail: job.reason.clone(),
    });
    state.deletion_jobs.insert(id.clone(), job);
    Ok(json_response(StatusCode::ACCEPTED, &serde_json::json!({ "job_id": id })))
}

async fn approve_deletion(state: &AppState, job_id: &str, req: Request<Incoming>) -> trc::Result<ApiResponse> {
    let body = read_json(req).await?;
    let approver = body["approved_by"].as_str().unwrap_or("unknown").to_string();
    let mut job = state
        .deletion_jobs
        .get_mut(job_id)
        .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "deletion job not found"))?;
    jobs::deletion::approve(&mut job, &approver);
    state.deletion_audit.write().push(common::job::DeletionAuditEntry {
        job_id: job_id.to_string(),
        at: common::now(),
        actor: approver,
        event: DeletionAuditEvent::Approved,
        detail: String::new(),
    });
    Ok(json_response(StatusCode::OK, &serde_json::json!({ "approved_by": job.approved_by })))
}

fn get_deletion(state: &AppState, job_id: &str) -> trc::Result<ApiResponse> {
    let job = state
        .deletion_jobs
        .get(job_id)
        .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "deletion job not found"))?;
    Ok(json_response(StatusCode::OK, &serde_json::json!({
        "id": job.id,
        "status": format!("{:?}", job.status),
        "approved_by": job.approved_by,
    })))
}

async fn create_legal_hold(state: &AppState, req: Request<Incoming>) -> trc::Result<ApiResponse> {
    let body = read_json(req).await?;
    let scope = match body["scope"].as_str().unwrap_or("user") {
        "org" => LegalHoldScope::Org,
        "domain" => LegalHoldScope::Domain,
        _ => LegalHoldScope::User,
    };
    let hold = LegalHold {
        id: new_job_id(),
        scope,
        scope_id: body["scope_id"].as_str().unwrap_or_default().to_string(),
        start_date: common::now(),
        end_date: None,
        keywords: body["keywords"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()),
        active: true,
    };
    let id = hold.id.clone();
    state.legal_holds.write().push(hold);
    Ok(json_response(StatusCode::CREATED, &serde_json::json!({ "hold_id": id })))
}
