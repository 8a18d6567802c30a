//! Wall-clock deadline for one in-flight job.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::CompletionGate;
use crate::error::WorkerError;

/// A single armed timer racing one job.
///
/// The deadline cannot preempt the parsing collaborator's underlying
/// work; it only stops the supervisor from waiting and reports a timeout
/// outcome through the gate.
pub struct DeadlineGuard {
    cancel: CancellationToken,
}

impl DeadlineGuard {
    /// Schedule a timeout failure unless `disarm` is called first.
    pub fn arm(limit: Duration, gate: CompletionGate) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    gate.fail(WorkerError::Timeout {
                        limit_ms: limit.as_millis() as u64,
                    })
                    .await;
                }
            }
        });

        Self { cancel }
    }

    /// Cancel the timer. Safe to call any number of times, before or
    /// after the timer fired.
    pub fn disarm(&self) {
        self.cancel.cancel();
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::CompletionGate;
    use crate::testing::MockEnvironment;

    #[tokio::test(start_paused = true)]
    async fn expiry_completes_the_gate_with_timeout() {
        let environment = MockEnvironment::new();
        let (gate, rx) = CompletionGate::new(environment.clone());
        let _guard = DeadlineGuard::arm(Duration::from_millis(100), gate);

        let outcome = rx.await.unwrap();
        let error = outcome.unwrap_err();
        assert!(error.is_timeout());
        assert_eq!(error.to_string(), "time limit 100 ms exceeded, killing job");
        assert_eq!(environment.teardown_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_prevents_expiry() {
        let environment = MockEnvironment::new();
        let (gate, _rx) = CompletionGate::new(environment.clone());
        let guard = DeadlineGuard::arm(Duration::from_millis(100), gate.clone());

        guard.disarm();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(!gate.is_completed());
        assert_eq!(environment.teardown_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_is_idempotent_even_after_expiry() {
        let environment = MockEnvironment::new();
        let (gate, rx) = CompletionGate::new(environment);
        let guard = DeadlineGuard::arm(Duration::from_millis(10), gate);

        // Let the timer fire, then disarm repeatedly.
        let _ = rx.await.unwrap();
        guard.disarm();
        guard.disarm();
        drop(guard);
    }
}
