//! Long-running consumer of queued creation jobs.
//!
//! Executors pull jobs from the durable queue under two independent bounds:
//! a concurrency ceiling (semaphore) and a start-rate ceiling (sliding
//! window). Each job makes one backend call and relays the outcome over a
//! transient ORDER-namespace connection, torn down on every exit path.

mod rate_limit;

pub use rate_limit::RateLimiter;

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde_json::{json, Value};
use tokio::sync::{watch, Semaphore};
use tokio::task;

use crate::domain::errors::DomainError;
use crate::domain::ports::{BackendOrder, JobQueue, OrderBackend, QueuedJob};
use crate::relay::{Namespace, Relay, EVENT_ORDER_CREATE};

/// Tunable worker bounds. The defaults mirror production: 5 simultaneous
/// jobs, 10 job-starts per rolling second.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub concurrency: usize,
    pub rate_limit: usize,
    pub rate_window: Duration,
    pub poll_interval: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            rate_limit: 10,
            rate_window: Duration::from_secs(1),
            poll_interval: Duration::from_millis(250),
        }
    }
}

pub struct OrderWorker {
    queue: Arc<dyn JobQueue>,
    backend: Arc<dyn OrderBackend>,
    relay: Arc<Relay>,
    settings: WorkerSettings,
}

impl OrderWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        backend: Arc<dyn OrderBackend>,
        relay: Arc<Relay>,
        settings: WorkerSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            backend,
            relay,
            settings,
        })
    }

    /// Claim-and-dispatch loop. Returns after `shutdown` flips to true and
    /// all in-flight jobs have drained.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let limiter = Arc::new(RateLimiter::new(
            self.settings.rate_limit,
            self.settings.rate_window,
        ));
        info!(
            "order worker started (concurrency {}, {} starts per {:?})",
            self.settings.concurrency, self.settings.rate_limit, self.settings.rate_window
        );

        while !*shutdown.borrow() {
            // Hold a slot and a start token before claiming, so accepted
            // bursts queue instead of executing past either bound.
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            limiter.acquire().await;

            match self.claim_next().await {
                Ok(Some(queued)) => {
                    let worker = Arc::clone(&self);
                    task::spawn(async move {
                        worker.process(queued).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(e) => {
                    drop(permit);
                    error!("queue claim failed: {}", e);
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        // Drain: every permit back means every spawned job finished.
        let _ = semaphore
            .acquire_many(self.settings.concurrency as u32)
            .await;
        info!("order worker stopped");
    }

    async fn claim_next(&self) -> Result<Option<QueuedJob>, DomainError> {
        let queue = Arc::clone(&self.queue);
        task::spawn_blocking(move || queue.claim_next())
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?
    }

    /// Execute one claimed job: backend call, relay emission, queue
    /// acknowledgement. The relay connection is scoped to this job and
    /// dropped on every path.
    async fn process(&self, queued: QueuedJob) {
        info!(
            "processing job {} (attempt {}, user {})",
            queued.id, queued.attempts, queued.job.user_id
        );

        let conn = self.relay.connect(Namespace::Order);
        match self.backend.create_order(&queued.job).await {
            Ok(created) => {
                conn.emit(
                    EVENT_ORDER_CREATE,
                    success_payload(&created, &queued.job.correlation_id),
                );
                if let Err(e) = self.ack(&queued, None).await {
                    error!("failed to complete job {}: {}", queued.id, e);
                } else {
                    info!(
                        "job {} completed (order {:?})",
                        queued.id, created.order_id
                    );
                }
            }
            Err(backend_err) => {
                warn!("job {} backend call failed: {}", queued.id, backend_err);
                conn.emit(
                    EVENT_ORDER_CREATE,
                    json!({
                        "user_id": queued.job.user_id,
                        "correlation_id": queued.job.correlation_id,
                        "error": backend_err.to_string(),
                    }),
                );
                if let Err(e) = self.ack(&queued, Some(backend_err.to_string())).await {
                    error!("failed to report job {} failure: {}", queued.id, e);
                }
            }
        }
        drop(conn);
    }

    async fn ack(&self, queued: &QueuedJob, error: Option<String>) -> Result<(), DomainError> {
        let queue = Arc::clone(&self.queue);
        let id = queued.id;
        task::spawn_blocking(move || match error {
            None => queue.complete(id),
            Some(message) => queue.fail(id, &message),
        })
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
    }
}

/// Backend socket payload merged with the job's correlation id, so relay
/// consumers can classify the origin.
fn success_payload(created: &BackendOrder, correlation_id: &Option<String>) -> Value {
    let mut payload = match &created.socket_data {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("socket_data".to_string(), other.clone());
            map
        }
    };
    payload.insert("correlation_id".to_string(), json!(correlation_id));
    Value::Object(payload)
}
