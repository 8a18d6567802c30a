//! Per-job fault isolation.
//!
//! The parsing collaborator may raise errors outside the awaited call
//! path: a browser-automation backend emitting on its own event loop, a
//! helper task panicking. The barrier scopes one job's asynchronous
//! activity. The parse future runs on its own task so a panic surfaces
//! as a join error, and collaborators report out-of-band errors through
//! a per-job fault channel. The first signal completes the gate; nothing
//! escapes to sibling jobs or takes down the process.

use std::future::Future;

use anyhow::anyhow;
use serde_json::Value;
use tokio::sync::mpsc;

use super::CompletionGate;
use crate::error::WorkerError;
use crate::queue::ParseReport;

/// Sink for out-of-band collaborator errors, scoped to one job.
#[derive(Clone)]
pub struct FaultHandle {
    tx: mpsc::UnboundedSender<anyhow::Error>,
}

impl FaultHandle {
    /// Report an error raised outside the awaited parse path.
    ///
    /// Reports arriving after the job reached a terminal state are
    /// discarded by the completion gate.
    pub fn report(&self, error: anyhow::Error) {
        let _ = self.tx.send(error);
    }
}

/// Error scope for exactly one job's asynchronous activity.
pub struct FaultBarrier {
    tx: mpsc::UnboundedSender<anyhow::Error>,
    rx: mpsc::UnboundedReceiver<anyhow::Error>,
}

impl FaultBarrier {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Handle collaborators use to report out-of-band errors into this scope.
    pub fn handle(&self) -> FaultHandle {
        FaultHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run one job's parse to its first terminal signal.
    ///
    /// Completes the gate with whichever arrives first: the parse result,
    /// a parse error, a panic on the parse task, or an out-of-band fault.
    /// A parse outliving a fault keeps running detached; its eventual
    /// completion is discarded by the gate.
    pub async fn run<F>(mut self, work: F, gate: CompletionGate)
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let task = tokio::spawn(work);

        tokio::select! {
            joined = task => match joined {
                Ok(Ok(result)) => gate.complete(Ok(ParseReport { result })).await,
                Ok(Err(e)) => gate.fail(WorkerError::Collaborator(e)).await,
                Err(e) => {
                    gate.fail(WorkerError::Collaborator(anyhow!(
                        "parse task aborted: {e}"
                    )))
                    .await;
                }
            },
            Some(fault) = self.rx.recv() => {
                gate.fail(WorkerError::Collaborator(fault)).await;
            }
        }
    }
}

impl Default for FaultBarrier {
    fn default() -> Self {
        Self::new()
    }
}
