//! Job payload model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::engine::EnvOverrides;
use crate::error::WorkerError;

/// One parsing request dequeued from the shared queue.
///
/// Owned by the supervisor for the duration of one execution and
/// acknowledged exactly once via the queue's completion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub request: JobRequest,
}

/// Semantic payload of a parsing job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRequest {
    /// Target URL, normalized at context build time.
    pub url: String,
    /// Extraction rules evaluated by the parsing backend.
    pub rules: Value,
    /// Per-job environment option overrides.
    pub options: Option<EnvOverrides>,
    /// Ordered pre-parse steps (backend-specific).
    pub actions: Option<Value>,
    /// Multi-page traversal rules.
    pub pagination: Option<Value>,
    /// Post-processing spec.
    pub transform: Option<Value>,
    /// Parameters substituted into the rules.
    pub rules_params: Option<Value>,
}

/// Successful parse output reported back to the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseReport {
    pub result: Value,
}

/// Terminal outcome of one job: a parse report or a single worker error.
pub type JobOutcome = std::result::Result<ParseReport, WorkerError>;
