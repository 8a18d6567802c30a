//! Worker process loop.
//!
//! Consumes jobs from the queue, supervises each on its own task, and
//! retires the process when memory crosses the threshold: stop
//! consuming, drain in-flight jobs up to the grace period, return. The
//! caller (the binary) then exits with code 0; the queue layer redelivers
//! anything left unfinished.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::queue::JobQueue;
use crate::supervisor::{JobSupervisor, MemoryMonitor};

/// RAII counter for in-flight jobs.
struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl InFlightGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Worker {
    queue: Arc<dyn JobQueue>,
    supervisor: Arc<JobSupervisor>,
    monitor: MemoryMonitor,
    grace_period: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        supervisor: Arc<JobSupervisor>,
        monitor: MemoryMonitor,
        grace_period: Duration,
    ) -> Self {
        Self {
            queue,
            supervisor,
            monitor,
            grace_period,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Consume jobs until the memory ceiling is hit or the subscription
    /// ends, then drain in-flight work and return.
    pub async fn run(self) -> Result<()> {
        info!("worker starting");

        loop {
            // Checked before accepting, so a breach never admits one more job.
            if self.monitor.check() {
                warn!("memory limit exceeded, shutting down worker");
                break;
            }

            let job = match self.queue.next().await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    info!("job subscription ended");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "failed to receive job");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            let guard = InFlightGuard::new(self.in_flight.clone());
            let queue = self.queue.clone();
            let supervisor = self.supervisor.clone();

            tokio::spawn(async move {
                let _guard = guard;
                let job_id = job.id;
                let outcome = supervisor.execute(job).await;
                if let Err(e) = queue.complete(job_id, &outcome).await {
                    error!(job_id = %job_id, error = %e, "failed to report job outcome");
                }
            });
        }

        self.drain().await;
        info!("worker stopped");
        Ok(())
    }

    /// Wait up to the grace period for in-flight jobs to finish.
    async fn drain(&self) {
        let remaining = self.in_flight.load(Ordering::SeqCst);
        if remaining == 0 {
            return;
        }
        info!(count = remaining, "waiting for in-flight jobs to finish");

        let start = tokio::time::Instant::now();
        while self.in_flight.load(Ordering::SeqCst) > 0 && start.elapsed() < self.grace_period {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let leftover = self.in_flight.load(Ordering::SeqCst);
        if leftover > 0 {
            warn!(count = leftover, "grace period elapsed with jobs still running");
        }
    }
}
