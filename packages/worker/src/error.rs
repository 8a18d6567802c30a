//! Worker error taxonomy.
//!
//! Every error here is terminal for a single job and travels through the
//! completion gate exactly once. Teardown failures are not represented:
//! they are swallowed (and logged) inside the gate and never reach the
//! queue.

use thiserror::Error;

/// Terminal error for one parsing job.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The job exceeded its wall-clock deadline.
    #[error("time limit {limit_ms} ms exceeded, killing job")]
    Timeout { limit_ms: u64 },

    /// The parsing collaborator rejected, raised out-of-band, panicked,
    /// or failed to construct. Carries the original diagnostic.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl WorkerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkerError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_the_limit() {
        let error = WorkerError::Timeout { limit_ms: 120_000 };
        assert_eq!(error.to_string(), "time limit 120000 ms exceeded, killing job");
        assert!(error.is_timeout());
    }

    #[test]
    fn collaborator_preserves_diagnostic() {
        let error = WorkerError::from(anyhow::anyhow!("selector not found"));
        assert_eq!(error.to_string(), "selector not found");
        assert!(!error.is_timeout());
    }
}
