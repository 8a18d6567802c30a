//! Per-job orchestration.
//!
//! State machine per job:
//! `Received → Running → {Succeeded, Failed, TimedOut} → Reported`.
//! Every terminal path funnels through the completion gate, so exactly
//! one outcome leaves this module per job.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{CompletionGate, DeadlineGuard, ExecutionContext, FaultBarrier};
use crate::engine::{EnvOptions, ParseArgs, ParserBackend};
use crate::error::WorkerError;
use crate::queue::{Job, JobOutcome};

/// Supervises individual job executions against one parsing backend.
pub struct JobSupervisor {
    backend: Arc<dyn ParserBackend>,
    default_options: EnvOptions,
    time_limit: Duration,
}

impl JobSupervisor {
    pub fn new(backend: Arc<dyn ParserBackend>, time_limit: Duration) -> Self {
        Self {
            backend,
            default_options: EnvOptions::default(),
            time_limit,
        }
    }

    /// Replace the process-wide default options.
    pub fn with_default_options(mut self, options: EnvOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Execute one job to its single terminal outcome.
    ///
    /// A timeout does not preempt the collaborator's underlying work; the
    /// detached parse finishes on its own and its late signal is discarded
    /// by the gate.
    pub async fn execute(&self, job: Job) -> JobOutcome {
        let job_id = job.id;
        let request = job.request;
        debug!(job_id = %job_id, url = %request.url, "starting job");

        let context = match ExecutionContext::build(
            &self.default_options,
            request.options.as_ref(),
            &request.url,
        ) {
            Ok(context) => context,
            Err(e) => return Err(WorkerError::Collaborator(e)),
        };

        let environment = match self.backend.environment(context.options) {
            Ok(environment) => environment,
            Err(e) => return Err(WorkerError::Collaborator(e)),
        };

        let (gate, outcome_rx) = CompletionGate::new(environment.clone());
        let deadline = DeadlineGuard::arm(self.time_limit, gate.clone());
        let barrier = FaultBarrier::new();

        match self
            .backend
            .parser(environment, request.pagination, barrier.handle())
        {
            Ok(parser) => {
                let args = ParseArgs {
                    actions: request.actions,
                    rules: request.rules,
                    transform: request.transform,
                    rules_params: request.rules_params,
                };
                let work = async move { parser.parse(args).await };
                tokio::spawn(barrier.run(work, gate.clone()));
            }
            Err(e) => {
                // Synchronous construction failure; the armed timer and
                // the gate still resolve to this single outcome.
                gate.fail(WorkerError::Collaborator(e)).await;
            }
        }

        let outcome = match outcome_rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(WorkerError::Collaborator(anyhow::anyhow!(
                "job outcome channel closed before completion"
            ))),
        };
        deadline.disarm();

        match &outcome {
            Ok(_) => debug!(job_id = %job_id, "job succeeded"),
            Err(e) => debug!(job_id = %job_id, error = %e, "job failed"),
        }
        outcome
    }
}
