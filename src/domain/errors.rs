use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing or malformed input; rejected synchronously, never queued.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Catalog/room/user store unreachable. No partial order is built.
    #[error("Lookup store unavailable: {0}")]
    LookupUnavailable(String),

    /// The job queue refused or could not durably accept the job.
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
