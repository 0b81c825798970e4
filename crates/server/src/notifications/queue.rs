//! Dispatch job tracking.
//!
//! Dispatch work runs as an explicit job with an observable handle
//! instead of a detached spawn, so callers can await the summary and see
//! which dispatches are still in flight.

use crate::error::DispatchJobError;
use crate::notifications::batch::DispatchSummary;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, oneshot};

/// Handle for one submitted dispatch job.
pub struct QueuedDispatch {
    job_id: u64,
    result: oneshot::Receiver<DispatchSummary>,
}

impl QueuedDispatch {
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Waits for the job to finish and returns its summary. Fails only
    /// when the job died without reporting one.
    pub async fn wait(self) -> Result<DispatchSummary, DispatchJobError> {
        self.result.await.map_err(|_| DispatchJobError)
    }
}

/// Tracks in-flight dispatch jobs.
pub struct DispatchQueue {
    // Shared with each spawned job so it can deregister itself.
    running: Arc<RwLock<HashMap<u64, String>>>,
    next_job_id: AtomicU64,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            running: Arc::new(RwLock::new(HashMap::new())),
            next_job_id: AtomicU64::new(0),
        }
    }

    /// Registers `job` under a fresh id, spawns it, and returns a handle
    /// resolving to its summary. `label` names the job for observability.
    #[tracing::instrument(skip(self, job))]
    pub async fn submit<F>(&self, label: &str, job: F) -> QueuedDispatch
    where
        F: Future<Output = DispatchSummary> + Send + 'static,
    {
        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();

        {
            let mut running = self.running.write().await;
            running.insert(job_id, label.to_string());
        }

        let registry = self.running.clone();
        tokio::spawn(async move {
            let summary = job.await;
            {
                let mut running = registry.write().await;
                running.remove(&job_id);
            }
            // Receiver may have been dropped; the job still completed.
            let _ = tx.send(summary);
        });

        QueuedDispatch { job_id, result: rx }
    }

    /// Check if a job is still in flight.
    #[tracing::instrument(skip(self))]
    pub async fn is_running(&self, job_id: u64) -> bool {
        let running = self.running.read().await;
        running.contains_key(&job_id)
    }

    /// Snapshot of in-flight jobs as `(job id, label)` pairs.
    pub async fn active_jobs(&self) -> Vec<(u64, String)> {
        let running = self.running.read().await;
        running
            .iter()
            .map(|(job_id, label)| (*job_id, label.clone()))
            .collect()
    }
}
