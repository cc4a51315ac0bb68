use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::catalog::{CatalogEntry, RoomEntry};
use super::errors::DomainError;
use super::intent::ParsedIntent;
use super::order::CreationJob;

/// User resolved from an API key by the auth layer.
#[derive(Debug, Clone)]
pub struct ApiUser {
    pub id: i64,
    pub api_key: String,
}

/// Read-only lookup into the main application's catalog tables.
/// Implementations are stateless per call; no locks are held across I/O.
pub trait CatalogStore: Send + Sync + 'static {
    fn products(&self, user_id: i64) -> Result<Vec<CatalogEntry>, DomainError>;

    /// Partial-name room lookup (`LIKE %name%`). Returns zero or one row in
    /// practice; callers take the first.
    fn rooms_by_name(&self, partial_name: &str, user_id: i64)
        -> Result<Vec<RoomEntry>, DomainError>;
}

impl<T: CatalogStore + ?Sized> CatalogStore for std::sync::Arc<T> {
    fn products(&self, user_id: i64) -> Result<Vec<CatalogEntry>, DomainError> {
        (**self).products(user_id)
    }

    fn rooms_by_name(
        &self,
        partial_name: &str,
        user_id: i64,
    ) -> Result<Vec<RoomEntry>, DomainError> {
        (**self).rooms_by_name(partial_name, user_id)
    }
}

pub trait UserStore: Send + Sync + 'static {
    fn user_by_api_key(&self, api_key: &str) -> Result<Option<ApiUser>, DomainError>;
}

/// A creation job claimed from the queue, with its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: Uuid,
    pub attempts: i32,
    pub job: CreationJob,
}

/// Durable job queue. `submit` returning `Ok` means the job is accepted and
/// will survive a process restart; execution is decoupled from acceptance.
pub trait JobQueue: Send + Sync + 'static {
    fn submit(&self, job: &CreationJob) -> Result<Uuid, DomainError>;

    /// Claim the next due job, marking it running. Returns `None` when the
    /// queue has no due work.
    fn claim_next(&self) -> Result<Option<QueuedJob>, DomainError>;

    fn complete(&self, id: Uuid) -> Result<(), DomainError>;

    /// Report a failed attempt. The queue's own retry/backoff policy decides
    /// whether the job is re-pended or exhausted; workers never retry inline.
    fn fail(&self, id: Uuid, error: &str) -> Result<(), DomainError>;
}

/// Turns one free-text order description into a validated `ParsedIntent`.
#[async_trait]
pub trait IntentParser: Send + Sync + 'static {
    async fn parse(&self, text: &str) -> Result<ParsedIntent, DomainError>;
}

/// Successful backend order creation: the created order id plus the opaque
/// socket payload the backend wants broadcast.
#[derive(Debug, Clone)]
pub struct BackendOrder {
    pub order_id: Option<i64>,
    pub socket_data: Value,
}

/// External order-creation API.
#[async_trait]
pub trait OrderBackend: Send + Sync + 'static {
    async fn create_order(&self, job: &CreationJob) -> Result<BackendOrder, BackendError>;
}

/// Worker-side failure taxonomy. All variants are handled inside the worker:
/// converted into an error relay event and reported to the queue.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend call timed out")]
    Timeout,

    #[error("backend network error: {0}")]
    Network(String),

    #[error("backend rejected order: {0}")]
    Rejected(String),

    #[error("backend returned malformed response: {0}")]
    InvalidResponse(String),
}
