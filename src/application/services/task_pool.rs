//! Background Task Pool
//!
//! Side effects of live traffic (snapshot persistence, presence mirroring)
//! are submitted here instead of being spawned ad hoc. Submissions go into a
//! bounded queue and run with bounded concurrency; a full queue rejects the
//! job. Rejections and failures are logged, counted and exported as metrics.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};

use crate::infrastructure::metrics;

type Job = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

struct Task {
    name: &'static str,
    job: Job,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time task pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskPoolStats {
    pub submitted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Bounded executor for fire-and-forget jobs.
#[derive(Clone)]
pub struct TaskPool {
    tx: mpsc::Sender<Task>,
    counters: Arc<Counters>,
}

impl TaskPool {
    /// Start the pool. Must be called from within a Tokio runtime.
    pub fn new(max_concurrency: usize, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));

        tokio::spawn(run(rx, permits, counters.clone()));

        Self { tx, counters }
    }

    /// Queue a job without waiting. Returns `false` if the queue is full.
    pub fn submit<F>(&self, name: &'static str, job: F) -> bool
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let task = Task {
            name,
            job: Box::pin(job),
        };

        match self.tx.try_send(task) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                metrics::record_task(name, "rejected");
                tracing::warn!(task = name, "Background task queue full, job dropped");
                false
            }
        }
    }

    pub fn stats(&self) -> TaskPoolStats {
        TaskPoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn run(mut rx: mpsc::Receiver<Task>, permits: Arc<Semaphore>, counters: Arc<Counters>) {
    while let Some(task) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let counters = counters.clone();

        tokio::spawn(async move {
            let _permit = permit;
            match task.job.await {
                Ok(()) => {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                    metrics::record_task(task.name, "ok");
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    metrics::record_task(task.name, "error");
                    tracing::warn!(task = task.name, error = %e, "Background task failed");
                }
            }
        });
    }

    tracing::debug!("Background task pool stopped");
}
