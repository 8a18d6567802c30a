//! Job queue contracts and the NATS transport.
//!
//! The queue layer owns storage, delivery, and retry policy. This worker
//! only consumes jobs and reports exactly one outcome per job.

mod job;
mod nats;

pub use job::{Job, JobOutcome, JobRequest, ParseReport};
pub use nats::NatsJobQueue;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Source and sink for parsing jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Wait for the next job. `None` means the subscription ended.
    async fn next(&self) -> Result<Option<Job>>;

    /// Report a job's terminal outcome. Invoked exactly once per job;
    /// the completion gate upstream enforces that.
    async fn complete(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<()>;
}
