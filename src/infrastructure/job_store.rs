//! Diesel-backed durable job queue.
//!
//! A job row is the queue's unit of persistence: accepted on `submit`,
//! claimed with `FOR UPDATE SKIP LOCKED` so concurrent executors never
//! double-claim, and re-pended with exponential backoff on failure until
//! the attempt budget is spent. A claim takes a time-bounded lease
//! (`claimed_at`); a RUNNING row whose lease has lapsed is treated as a
//! crashed attempt and becomes claimable again. Delivery is at-least-once
//! by design.

use std::time::Duration;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::error;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::CreationJob;
use crate::domain::ports::{JobQueue, QueuedJob};
use crate::schema::order_jobs;

use super::models::{JobRow, NewJobRow};

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_RUNNING: &str = "RUNNING";
pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_FAILED: &str = "FAILED";

/// Retry policy knobs. The worker never retries inline; this policy is the
/// single owner of reattempt count, delay and claim lease.
#[derive(Debug, Clone)]
pub struct JobQueueConfig {
    pub max_attempts: i32,
    pub backoff_base: Duration,
    /// How long a claim may stay RUNNING before it counts as a crashed
    /// attempt. Must comfortably exceed the backend request timeout.
    pub lease_timeout: Duration,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
            lease_timeout: Duration::from_secs(60),
        }
    }
}

/// Delay before attempt `attempts + 1`: exponential in the attempts already
/// spent, capped at one minute.
pub fn backoff_delay(attempts: i32, base: Duration) -> Duration {
    let exp = attempts.saturating_sub(1).clamp(0, 16) as u32;
    let delay = base.saturating_mul(2u32.saturating_pow(exp));
    delay.min(Duration::from_secs(60))
}

/// What to do with a row selected for claiming.
#[derive(Debug, PartialEq, Eq)]
pub enum ClaimTransition {
    /// Run the job as attempt number `attempts`.
    Run { attempts: i32 },
    /// The row is a lapsed lease whose last attempt was already spent.
    Exhausted,
}

/// A PENDING row is always within budget (`fail` parks it otherwise); only a
/// reclaimed RUNNING row can arrive with no attempts left.
pub fn claim_transition(status: &str, attempts: i32, max_attempts: i32) -> ClaimTransition {
    if status == STATUS_RUNNING && attempts >= max_attempts {
        ClaimTransition::Exhausted
    } else {
        ClaimTransition::Run {
            attempts: attempts + 1,
        }
    }
}

/// What to do with a row whose attempt just failed.
#[derive(Debug, PartialEq, Eq)]
pub enum FailureTransition {
    Retry { available_at: DateTime<Utc> },
    Exhausted,
}

pub fn failure_transition(
    attempts: i32,
    config: &JobQueueConfig,
    now: DateTime<Utc>,
) -> FailureTransition {
    if attempts >= config.max_attempts {
        FailureTransition::Exhausted
    } else {
        let delay = backoff_delay(attempts, config.backoff_base);
        let available_at = now
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(60));
        FailureTransition::Retry { available_at }
    }
}

pub struct DieselJobQueue {
    pool: DbPool,
    config: JobQueueConfig,
}

impl DieselJobQueue {
    pub fn new(pool: DbPool, config: JobQueueConfig) -> Self {
        Self { pool, config }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>, DomainError> {
        self.pool
            .get()
            .map_err(|e| DomainError::QueueUnavailable(e.to_string()))
    }
}

impl JobQueue for DieselJobQueue {
    fn submit(&self, job: &CreationJob) -> Result<Uuid, DomainError> {
        let payload = serde_json::to_value(job)
            .map_err(|e| DomainError::Internal(format!("job payload serialization: {}", e)))?;

        let mut conn = self.conn()?;
        let id = Uuid::new_v4();
        diesel::insert_into(order_jobs::table)
            .values(&NewJobRow {
                id,
                payload,
                status: STATUS_PENDING.to_string(),
            })
            .execute(&mut conn)
            .map_err(|e| DomainError::QueueUnavailable(e.to_string()))?;
        Ok(id)
    }

    fn claim_next(&self) -> Result<Option<QueuedJob>, DomainError> {
        let mut conn = self.conn()?;
        let now = Utc::now();
        let lease_cutoff = now
            - chrono::Duration::from_std(self.config.lease_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(60));

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            // Due pending jobs, plus running jobs whose claim lease lapsed
            // (the claiming process died between claim and ack).
            let row: Option<JobRow> = order_jobs::table
                .filter(
                    order_jobs::status
                        .eq(STATUS_PENDING)
                        .and(order_jobs::available_at.le(now))
                        .or(order_jobs::status
                            .eq(STATUS_RUNNING)
                            .and(order_jobs::claimed_at.le(lease_cutoff))),
                )
                .order(order_jobs::available_at.asc())
                .limit(1)
                .for_update()
                .skip_locked()
                .select(JobRow::as_select())
                .first(conn)
                .optional()?;

            let Some(row) = row else {
                return Ok(None);
            };

            let attempts = match claim_transition(&row.status, row.attempts, self.config.max_attempts)
            {
                ClaimTransition::Run { attempts } => attempts,
                ClaimTransition::Exhausted => {
                    diesel::update(order_jobs::table.find(row.id))
                        .set((
                            order_jobs::status.eq(STATUS_FAILED),
                            order_jobs::last_error
                                .eq("claim lease expired with no attempts left"),
                        ))
                        .execute(conn)?;
                    return Ok(None);
                }
            };
            diesel::update(order_jobs::table.find(row.id))
                .set((
                    order_jobs::status.eq(STATUS_RUNNING),
                    order_jobs::attempts.eq(attempts),
                    order_jobs::claimed_at.eq(now),
                ))
                .execute(conn)?;

            match serde_json::from_value::<CreationJob>(row.payload) {
                Ok(job) => Ok(Some(QueuedJob {
                    id: row.id,
                    attempts,
                    job,
                })),
                Err(e) => {
                    // A payload this process cannot read will never become
                    // readable; park it instead of looping on it.
                    error!("unreadable payload on job {}: {}", row.id, e);
                    diesel::update(order_jobs::table.find(row.id))
                        .set((
                            order_jobs::status.eq(STATUS_FAILED),
                            order_jobs::last_error.eq(format!("unreadable payload: {}", e)),
                        ))
                        .execute(conn)?;
                    Ok(None)
                }
            }
        })
        .map_err(|e| DomainError::Internal(e.to_string()))
    }

    fn complete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.conn()?;
        diesel::update(order_jobs::table.find(id))
            .set(order_jobs::status.eq(STATUS_COMPLETED))
            .execute(&mut conn)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(())
    }

    fn fail(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        let mut conn = self.conn()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let attempts: i32 = order_jobs::table
                .find(id)
                .select(order_jobs::attempts)
                .for_update()
                .first(conn)?;

            match failure_transition(attempts, &self.config, Utc::now()) {
                FailureTransition::Exhausted => {
                    diesel::update(order_jobs::table.find(id))
                        .set((
                            order_jobs::status.eq(STATUS_FAILED),
                            order_jobs::last_error.eq(error),
                        ))
                        .execute(conn)?;
                }
                FailureTransition::Retry { available_at } => {
                    diesel::update(order_jobs::table.find(id))
                        .set((
                            order_jobs::status.eq(STATUS_PENDING),
                            order_jobs::available_at.eq(available_at),
                            order_jobs::claimed_at.eq(None::<DateTime<Utc>>),
                            order_jobs::last_error.eq(error),
                        ))
                        .execute(conn)?;
                }
            }
            Ok(())
        })
        .map_err(|e| DomainError::Internal(e.to_string()))
    }
}
