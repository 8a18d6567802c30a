//! Exactly-once completion reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::warn;

use crate::engine::Environment;
use crate::error::WorkerError;
use crate::queue::JobOutcome;

/// Guarantees one job's outcome is reported exactly once.
///
/// Success, failure, and timeout race to complete a job; the first signal
/// claims the gate atomically and every later one is silently discarded.
/// On an error outcome the environment is torn down before the outcome is
/// forwarded; teardown failure is logged and swallowed so it can never
/// keep a job from being reported.
#[derive(Clone)]
pub struct CompletionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    completed: AtomicBool,
    environment: Arc<dyn Environment>,
    outcome_tx: Mutex<Option<oneshot::Sender<JobOutcome>>>,
}

impl CompletionGate {
    /// Create a gate for one job. The receiver yields the winning outcome.
    pub fn new(environment: Arc<dyn Environment>) -> (Self, oneshot::Receiver<JobOutcome>) {
        let (tx, rx) = oneshot::channel();
        let gate = Self {
            inner: Arc::new(GateInner {
                completed: AtomicBool::new(false),
                environment,
                outcome_tx: Mutex::new(Some(tx)),
            }),
        };
        (gate, rx)
    }

    /// True once a terminal signal has claimed the gate.
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::SeqCst)
    }

    /// Record the outcome unless another signal won first.
    pub async fn complete(&self, outcome: JobOutcome) {
        if self
            .inner
            .completed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        if outcome.is_err() {
            if let Err(e) = self.inner.environment.tear_down().await {
                warn!(error = %e, "environment teardown failed");
            }
        }

        let tx = self
            .inner
            .outcome_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(tx) = tx {
            // The receiver only disappears when the supervisor is gone.
            let _ = tx.send(outcome);
        }
    }

    /// Complete with an error outcome.
    pub async fn fail(&self, error: WorkerError) {
        self.complete(Err(error)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ParseReport;
    use crate::testing::MockEnvironment;
    use serde_json::json;

    #[tokio::test]
    async fn first_signal_wins_and_success_skips_teardown() {
        let environment = MockEnvironment::new();
        let (gate, rx) = CompletionGate::new(environment.clone());

        gate.complete(Ok(ParseReport {
            result: json!({ "title": "x" }),
        }))
        .await;
        gate.fail(WorkerError::Timeout { limit_ms: 5 }).await;

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.unwrap().result, json!({ "title": "x" }));
        assert_eq!(environment.teardown_count(), 0);
        assert!(gate.is_completed());
    }

    #[tokio::test]
    async fn error_outcome_tears_down_once() {
        let environment = MockEnvironment::new();
        let (gate, rx) = CompletionGate::new(environment.clone());

        gate.fail(WorkerError::Timeout { limit_ms: 100 }).await;
        gate.fail(WorkerError::Collaborator(anyhow::anyhow!("late"))).await;

        let outcome = rx.await.unwrap();
        assert!(outcome.unwrap_err().is_timeout());
        assert_eq!(environment.teardown_count(), 1);
    }

    #[tokio::test]
    async fn teardown_failure_is_swallowed() {
        let environment = MockEnvironment::failing_teardown();
        let (gate, rx) = CompletionGate::new(environment.clone());

        gate.fail(WorkerError::Collaborator(anyhow::anyhow!("boom"))).await;

        // The job is still reported despite the failed cleanup.
        let outcome = rx.await.unwrap();
        assert!(outcome.is_err());
        assert_eq!(environment.teardown_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_signals_claim_exactly_once() {
        let environment = MockEnvironment::new();
        let (gate, rx) = CompletionGate::new(environment.clone());

        let mut handles = Vec::new();
        for i in 0..8 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.fail(WorkerError::Collaborator(anyhow::anyhow!("signal {i}")))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(rx.await.unwrap().is_err());
        assert_eq!(environment.teardown_count(), 1);
    }
}
