use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Worker configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub nats_url: String,
    pub queue_name: String,
    pub memory_limit_bytes: u64,
    pub time_limit: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let memory_limit_mib: u64 = env::var("PARSER_MEMORY_LIMIT")
            .unwrap_or_else(|_| "256".to_string())
            .parse()
            .context("PARSER_MEMORY_LIMIT must be a number of MiB")?;

        let time_limit_ms: u64 = env::var("TIME_LIMIT_FOR_JOB")
            .unwrap_or_else(|_| "120000".to_string())
            .parse()
            .context("TIME_LIMIT_FOR_JOB must be a number of milliseconds")?;

        Ok(Self {
            nats_url: env::var("NATS_URL")
                .unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            queue_name: env::var("QUEUE_NAME")
                .unwrap_or_else(|_| "parser-default".to_string()),
            memory_limit_bytes: memory_limit_mib * 1024 * 1024,
            time_limit: Duration::from_millis(time_limit_ms),
        })
    }
}
