//! NATS-backed job transport.
//!
//! Jobs arrive as JSON messages on the configured channel; outcomes are
//! published to `<channel>.results` as `{ jobId, error|null, result|null }`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Job, JobOutcome, JobQueue};

/// Wire form of a completed job.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeMessage<'a> {
    job_id: Uuid,
    error: Option<String>,
    result: Option<&'a Value>,
}

impl<'a> OutcomeMessage<'a> {
    fn from_outcome(job_id: Uuid, outcome: &'a JobOutcome) -> Self {
        match outcome {
            Ok(report) => Self {
                job_id,
                error: None,
                result: Some(&report.result),
            },
            Err(e) => Self {
                job_id,
                error: Some(e.to_string()),
                result: None,
            },
        }
    }
}

/// Job queue consumer over a NATS subscription.
pub struct NatsJobQueue {
    client: async_nats::Client,
    subscriber: Mutex<async_nats::Subscriber>,
    results_subject: String,
}

impl NatsJobQueue {
    /// Subscribe to the named job channel.
    pub async fn subscribe(client: async_nats::Client, channel: &str) -> Result<Self> {
        debug!(channel = %channel, "subscribing to job channel");
        let subscriber = client
            .subscribe(channel.to_string())
            .await
            .context("failed to subscribe to job channel")?;

        Ok(Self {
            client,
            subscriber: Mutex::new(subscriber),
            results_subject: format!("{channel}.results"),
        })
    }
}

#[async_trait]
impl JobQueue for NatsJobQueue {
    async fn next(&self) -> Result<Option<Job>> {
        loop {
            let message = match self.subscriber.lock().await.next().await {
                Some(message) => message,
                None => return Ok(None),
            };

            match serde_json::from_slice::<Job>(&message.payload) {
                Ok(job) => {
                    debug!(job_id = %job.id, url = %job.request.url, "received job");
                    return Ok(Some(job));
                }
                Err(e) => {
                    // A malformed payload must not wedge the worker.
                    warn!(subject = %message.subject, error = %e, "dropping undecodable job payload");
                }
            }
        }
    }

    async fn complete(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<()> {
        let message = OutcomeMessage::from_outcome(job_id, outcome);
        let payload = Bytes::from(serde_json::to_vec(&message)?);
        self.client
            .publish(self.results_subject.clone(), payload)
            .await
            .context("failed to publish job outcome")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ParseReport;
    use serde_json::json;

    #[test]
    fn outcome_message_wire_shape_success() {
        let job_id = Uuid::nil();
        let outcome: JobOutcome = Ok(ParseReport {
            result: json!({ "title": "x" }),
        });
        let message = OutcomeMessage::from_outcome(job_id, &outcome);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "jobId": "00000000-0000-0000-0000-000000000000",
                "error": null,
                "result": { "title": "x" }
            })
        );
    }

    #[test]
    fn outcome_message_wire_shape_failure() {
        let job_id = Uuid::nil();
        let outcome: JobOutcome = Err(crate::WorkerError::Timeout { limit_ms: 100 });
        let message = OutcomeMessage::from_outcome(job_id, &outcome);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "jobId": "00000000-0000-0000-0000-000000000000",
                "error": "time limit 100 ms exceeded, killing job",
                "result": null
            })
        );
    }
}
