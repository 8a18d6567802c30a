//! Process memory sampling and the self-shutdown decision.
//!
//! Long-running workers accumulate resident memory (a leaking automation
//! backend is the usual culprit), so the worker retires itself once RSS
//! crosses a configured ceiling. Advisory backpressure, not a correctness
//! mechanism: the queue redelivers whatever a retiring worker leaves
//! behind.

use anyhow::{Context, Result};
use tracing::{debug, warn};

// statm reports pages; assume 4 KiB pages.
const PAGE_SIZE_BYTES: u64 = 4096;

/// Source of resident-memory samples.
pub trait MemorySampler: Send + Sync {
    /// Current resident set size in bytes.
    fn sample(&self) -> Result<u64>;
}

/// Samples resident memory from `/proc/self/statm`.
#[derive(Debug, Default)]
pub struct ProcSampler;

impl MemorySampler for ProcSampler {
    fn sample(&self) -> Result<u64> {
        let statm = std::fs::read_to_string("/proc/self/statm")
            .context("failed to read /proc/self/statm")?;
        let resident_pages: u64 = statm
            .split_whitespace()
            .nth(1)
            .context("malformed /proc/self/statm")?
            .parse()
            .context("malformed /proc/self/statm")?;
        Ok(resident_pages * PAGE_SIZE_BYTES)
    }
}

/// True iff the sampled resident memory exceeds the threshold.
pub fn should_shutdown(sampled_bytes: u64, threshold_bytes: u64) -> bool {
    sampled_bytes > threshold_bytes
}

/// Threshold check used by the worker loop between jobs.
pub struct MemoryMonitor {
    sampler: Box<dyn MemorySampler>,
    threshold_bytes: u64,
}

impl MemoryMonitor {
    pub fn new(threshold_bytes: u64) -> Self {
        Self {
            sampler: Box::new(ProcSampler),
            threshold_bytes,
        }
    }

    pub fn with_sampler(sampler: Box<dyn MemorySampler>, threshold_bytes: u64) -> Self {
        Self {
            sampler,
            threshold_bytes,
        }
    }

    /// Sample memory and decide whether the process should retire.
    /// A failed sample keeps the worker running.
    pub fn check(&self) -> bool {
        match self.sampler.sample() {
            Ok(bytes) => {
                debug!(
                    memory_bytes = bytes,
                    threshold_bytes = self.threshold_bytes,
                    "memory sampled"
                );
                should_shutdown(bytes, self.threshold_bytes)
            }
            Err(e) => {
                warn!(error = %e, "memory sampling failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSampler(Result<u64, String>);

    impl MemorySampler for FixedSampler {
        fn sample(&self) -> Result<u64> {
            match &self.0 {
                Ok(bytes) => Ok(*bytes),
                Err(message) => Err(anyhow::anyhow!("{message}")),
            }
        }
    }

    #[test]
    fn shutdown_is_strictly_greater_than() {
        let threshold = 256 * 1024 * 1024;
        assert!(!should_shutdown(threshold - 1, threshold));
        assert!(!should_shutdown(threshold, threshold));
        assert!(should_shutdown(threshold + 1, threshold));
    }

    #[test]
    fn monitor_decides_from_sample() {
        let over = MemoryMonitor::with_sampler(Box::new(FixedSampler(Ok(300))), 100);
        assert!(over.check());

        let under = MemoryMonitor::with_sampler(Box::new(FixedSampler(Ok(50))), 100);
        assert!(!under.check());
    }

    #[test]
    fn sampling_failure_keeps_running() {
        let monitor =
            MemoryMonitor::with_sampler(Box::new(FixedSampler(Err("no procfs".into()))), 100);
        assert!(!monitor.check());
    }
}
