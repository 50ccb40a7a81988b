//! Native stand-in for a pre-forking process manager.
//!
//! A fixed set of workers, each with a fixed number of request slots, admits
//! requests; every admitted request runs under a deadline. A request that
//! overruns is cancelled and answered with a server error, its slot is freed,
//! and the worker keeps serving.

use crate::config::Topology;
use crate::domain::model::WorkerSnapshot;
use crate::utils::error::{AppError, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::Instrument;

#[derive(Debug)]
pub struct Worker {
    id: usize,
    capacity: usize,
    slots: Arc<Semaphore>,
    served: AtomicU64,
    timed_out: AtomicU64,
}

impl Worker {
    fn new(id: usize, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            served: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id,
            capacity: self.capacity,
            in_flight: self.in_flight(),
            served: self.served.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// A request slot held on one worker; released on drop.
///
/// The worker permit is declared before the admission permit so it is
/// released first: a request holding an admission permit always finds a
/// free worker slot.
#[derive(Debug)]
pub struct Slot {
    worker: usize,
    _permit: OwnedSemaphorePermit,
    _admission: OwnedSemaphorePermit,
}

impl Slot {
    pub fn worker(&self) -> usize {
        self.worker
    }
}

#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<Worker>,
    admission: Arc<Semaphore>,
    next: AtomicUsize,
    request_timeout: Duration,
}

impl WorkerPool {
    pub fn new(topology: Topology) -> Self {
        let workers = (0..topology.workers)
            .map(|id| Worker::new(id, topology.threads_per_worker))
            .collect();
        Self {
            workers,
            admission: Arc::new(Semaphore::new(topology.total_slots())),
            next: AtomicUsize::new(0),
            request_timeout: topology.request_timeout,
        }
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.workers.iter().map(Worker::snapshot).collect()
    }

    /// Takes a free slot, starting the search at the next worker in rotation.
    /// When every slot in the pool is busy the request queues until any
    /// worker frees one.
    pub async fn admit(&self) -> Result<Slot> {
        let count = self.workers.len();
        if count == 0 {
            return Err(AppError::ServerError {
                message: "worker pool is empty".to_string(),
            });
        }

        let admission = match self.admission.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("All {} slots busy, queueing request", self.total_slots());
                self.admission
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::ServerError {
                        message: format!("worker pool stopped admitting requests: {}", e),
                    })?
            }
        };

        let start = self.next.fetch_add(1, Ordering::Relaxed) % count;
        for offset in 0..count {
            let worker = &self.workers[(start + offset) % count];
            if let Ok(permit) = worker.slots.clone().try_acquire_owned() {
                return Ok(Slot {
                    worker: worker.id,
                    _permit: permit,
                    _admission: admission,
                });
            }
        }

        Err(AppError::ServerError {
            message: "admitted request found no free worker slot".to_string(),
        })
    }

    pub fn total_slots(&self) -> usize {
        self.workers.iter().map(|w| w.capacity).sum()
    }

    fn record_served(&self, worker: usize) {
        if let Some(w) = self.workers.get(worker) {
            w.served.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_timeout(&self, worker: usize) {
        if let Some(w) = self.workers.get(worker) {
            w.timed_out.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Runs `work` on an admitted slot under the request deadline.
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: std::future::Future<Output = T>,
    {
        let slot = self.admit().await?;
        let worker = slot.worker();
        let outcome = tokio::time::timeout(self.request_timeout, work).await;
        drop(slot);

        match outcome {
            Ok(value) => {
                self.record_served(worker);
                Ok(value)
            }
            Err(_) => {
                self.record_timeout(worker);
                tracing::warn!(
                    "Worker {} cancelled a request after {:?}",
                    worker,
                    self.request_timeout
                );
                Err(AppError::RequestTimeout {
                    seconds: self.request_timeout.as_secs(),
                })
            }
        }
    }
}

/// Axum middleware that routes every request through the pool.
pub async fn supervise(
    State(pool): State<Arc<WorkerPool>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let span = tracing::debug_span!("worker.request", path = %request.uri().path());
    match pool.run(next.run(request).instrument(span)).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
