// Parser worker entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worker_core::engine::HttpBackend;
use worker_core::queue::NatsJobQueue;
use worker_core::supervisor::{JobSupervisor, MemoryMonitor};
use worker_core::worker::Worker;
use worker_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,worker_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(queue = %config.queue_name, "Starting parser worker");

    let client = async_nats::connect(&config.nats_url)
        .await
        .context("Failed to connect to NATS")?;
    let queue = Arc::new(NatsJobQueue::subscribe(client, &config.queue_name).await?);

    let backend = Arc::new(HttpBackend::new()?);
    let supervisor = Arc::new(JobSupervisor::new(backend, config.time_limit));
    let monitor = MemoryMonitor::new(config.memory_limit_bytes);

    // Drain grace period matches the per-job time limit.
    let worker = Worker::new(queue, supervisor, monitor, config.time_limit);
    worker.run().await
}
