// crates/server/src/exports/store.rs
//! In-memory table of export jobs.
//!
//! Jobs live only in process memory and are lost on restart.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use super::types::ExportJob;

/// Shared job table keyed by `job_id`.
///
/// Uses `std::sync::RwLock` because no lock is ever held across an `.await`.
/// Inserts and updates publish the new snapshot to `subscribe()` receivers.
pub struct JobStore {
    jobs: RwLock<HashMap<String, ExportJob>>,
    updates_tx: broadcast::Sender<ExportJob>,
}

impl JobStore {
    pub fn new() -> Self {
        let (updates_tx, _) = broadcast::channel(256);
        Self {
            jobs: RwLock::new(HashMap::new()),
            updates_tx,
        }
    }

    /// Insert or replace a job.
    pub fn put(&self, job: ExportJob) {
        self.write().insert(job.job_id.clone(), job.clone());
        self.publish(job);
    }

    /// Insert a job only if its id is unused. Returns `false` on collision.
    pub fn insert_new(&self, job: ExportJob) -> bool {
        {
            let mut jobs = self.write();
            if jobs.contains_key(&job.job_id) {
                return false;
            }
            jobs.insert(job.job_id.clone(), job.clone());
        }
        self.publish(job);
        true
    }

    pub fn get(&self, job_id: &str) -> Option<ExportJob> {
        self.read().get(job_id).cloned()
    }

    /// Apply `f` to the stored job and return the new snapshot.
    pub fn update<F>(&self, job_id: &str, f: F) -> Option<ExportJob>
    where
        F: FnOnce(&mut ExportJob),
    {
        let snapshot = {
            let mut jobs = self.write();
            let job = jobs.get_mut(job_id)?;
            f(job);
            job.clone()
        };
        self.publish(snapshot.clone());
        Some(snapshot)
    }

    pub fn delete(&self, job_id: &str) -> Option<ExportJob> {
        self.write().remove(job_id)
    }

    /// Remove every job matching `pred` in one critical section.
    pub fn remove_where<P>(&self, mut pred: P) -> Vec<ExportJob>
    where
        P: FnMut(&ExportJob) -> bool,
    {
        let mut jobs = self.write();
        let ids: Vec<String> = jobs
            .values()
            .filter(|job| pred(job))
            .map(|job| job.job_id.clone())
            .collect();
        ids.iter().filter_map(|id| jobs.remove(id)).collect()
    }

    /// All jobs, oldest first.
    pub fn list(&self) -> Vec<ExportJob> {
        let mut jobs: Vec<ExportJob> = self.read().values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.job_id.cmp(&b.job_id)));
        jobs
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExportJob> {
        self.updates_tx.subscribe()
    }

    fn publish(&self, job: ExportJob) {
        // No subscribers is fine.
        let _ = self.updates_tx.send(job);
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ExportJob>> {
        self.jobs.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading export jobs");
            PoisonError::into_inner(e)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ExportJob>> {
        self.jobs.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing export jobs");
            PoisonError::into_inner(e)
        })
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
