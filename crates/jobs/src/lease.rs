//! Single-flight job leases: a worker must hold the lease for a job id
//! before acting on it, and must renew it with a heartbeat or another
//! worker may steal it (§5: "long-running jobs use a CAS lease with
//! heartbeats so a crashed worker's job gets picked back up").

use chrono::Utc;
use common::JobLease;
use dashmap::DashMap;

pub struct LeaseTable {
    leases: DashMap<String, JobLease>,
    heartbeat_interval: chrono::Duration,
}

impl LeaseTable {
    pub fn new(heartbeat_interval: chrono::Duration) -> Self {
        LeaseTable {
            leases: DashMap::new(),
            heartbeat_interval,
        }
    }

    /// Acquires the lease for `job_id` if unheld, or if the existing lease
    /// is stale. Returns `Err(Conflict)` if another worker holds a live
    /// lease.
    pub fn acquire(&self, job_id: &str, worker_id: &str) -> trc::Result<()> {
        let now = Utc::now();
        let mut stale = false;
        if let Some(existing) = self.leases.get(job_id) {
            if !existing.is_stale(self.heartbeat_interval, now) {
                return Err(trc::Error::job(trc::JobEvent::LeaseStolen, "job is already leased by another worker"));
            }
            stale = true;
        }
        let _ = stale;
        self.leases.insert(
            job_id.to_string(),
            JobLease {
                job_id: job_id.to_string(),
                worker_id: worker_id.to_string(),
                heartbeat_at: now,
            },
        );
        Ok(())
    }

    pub fn heartbeat(&self, job_id: &str, worker_id: &str) -> trc::Result<()> {
        let mut lease = self
            .leases
            .get_mut(job_id)
            .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "no lease held for job"))?;
        if lease.worker_id != worker_id {
            return Err(trc::Error::job(trc::JobEvent::LeaseStolen, "lease is held by a different worker"));
        }
        lease.heartbeat_at = Utc::now();
        Ok(())
    }

    pub fn release(&self, job_id: &str, worker_id: &str) {
        self.leases.remove_if(job_id, |_, lease| lease.worker_id == worker_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_worker_cannot_acquire_a_live_lease() {
        let table = LeaseTable::new(chrono::Duration::seconds(30));
        table.acquire("job1", "worker-a").unwrap();
        let err = table.acquire("job1", "worker-b").unwrap_err();
        assert_eq!(err.kind, trc::Kind::Conflict);
    }

    #[test]
    fn releasing_allows_a_new_acquire() {
        let table = LeaseTable::new(chrono::Duration::seconds(30));
        table.acquire("job1", "worker-a").unwrap();
        table.release("job1", "worker-a");
        table.acquire("job1", "worker-b").unwrap();
    }

    #[test]
    fn heartbeat_from_the_wrong_worker_is_rejected() {
        let table = LeaseTable::new(chrono::Duration::seconds(30));
        table.acquire("job1", "worker-a").unwrap();
        let err = table.heartbeat("job1", "worker-b").unwrap_err();
        assert_eq!(err.kind, trc::Kind::Conflict);
    }
}
