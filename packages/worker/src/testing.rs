//! Test doubles for the queue and the parsing collaborators.
//!
//! In-memory implementations of the production contracts that record
//! interactions for assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::engine::{EnvOptions, Environment, ParseArgs, Parser, ParserBackend};
use crate::queue::{Job, JobOutcome, JobQueue, JobRequest};
use crate::supervisor::FaultHandle;

/// Build a minimal job for tests.
pub fn test_job(url: &str) -> Job {
    Job {
        id: Uuid::new_v4(),
        request: JobRequest {
            url: url.to_string(),
            ..Default::default()
        },
    }
}

/// Recorded completion for one job.
#[derive(Debug, Clone)]
pub struct RecordedCompletion {
    pub job_id: Uuid,
    pub error: Option<String>,
    pub result: Option<Value>,
}

/// In-memory queue delivering preloaded jobs and recording completions.
pub struct TestQueue {
    jobs: AsyncMutex<mpsc::UnboundedReceiver<Job>>,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    completions: Mutex<Vec<RecordedCompletion>>,
}

impl TestQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            jobs: AsyncMutex::new(receiver),
            sender: Mutex::new(Some(sender)),
            completions: Mutex::new(Vec::new()),
        }
    }

    /// Queue a job for delivery.
    pub fn push(&self, job: Job) {
        if let Some(sender) = self
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            let _ = sender.send(job);
        }
    }

    /// Close the job stream; `next` returns `None` once drained.
    pub fn close(&self) {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn completions(&self) -> Vec<RecordedCompletion> {
        self.completions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn completion_count(&self) -> usize {
        self.completions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn completions_for(&self, job_id: Uuid) -> Vec<RecordedCompletion> {
        self.completions()
            .into_iter()
            .filter(|c| c.job_id == job_id)
            .collect()
    }
}

impl Default for TestQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for TestQueue {
    async fn next(&self) -> Result<Option<Job>> {
        Ok(self.jobs.lock().await.recv().await)
    }

    async fn complete(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<()> {
        let completion = match outcome {
            Ok(report) => RecordedCompletion {
                job_id,
                error: None,
                result: Some(report.result.clone()),
            },
            Err(e) => RecordedCompletion {
                job_id,
                error: Some(e.to_string()),
                result: None,
            },
        };
        self.completions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(completion);
        Ok(())
    }
}

/// Environment double that counts teardowns and serves canned pages.
pub struct MockEnvironment {
    options: EnvOptions,
    pages: HashMap<String, String>,
    teardowns: AtomicUsize,
    fail_teardown: bool,
}

impl MockEnvironment {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            options: EnvOptions::default(),
            pages: HashMap::new(),
            teardowns: AtomicUsize::new(0),
            fail_teardown: false,
        })
    }

    /// Environment whose `tear_down` fails, for swallowed-cleanup tests.
    pub fn failing_teardown() -> Arc<Self> {
        Arc::new(Self {
            options: EnvOptions::default(),
            pages: HashMap::new(),
            teardowns: AtomicUsize::new(0),
            fail_teardown: true,
        })
    }

    /// Environment serving canned pages by URL; the first page's URL
    /// becomes the environment's target.
    pub fn with_pages(pages: Vec<(String, String)>) -> Arc<Self> {
        let mut options = EnvOptions::default();
        if let Some((url, _)) = pages.first() {
            options.url = url.clone();
        }
        Arc::new(Self {
            options,
            pages: pages.into_iter().collect(),
            teardowns: AtomicUsize::new(0),
            fail_teardown: false,
        })
    }

    pub fn teardown_count(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Environment for MockEnvironment {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no canned page for {url}"))
    }

    fn options(&self) -> &EnvOptions {
        &self.options
    }

    async fn tear_down(&self) -> Result<()> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_teardown {
            Err(anyhow!("teardown failed"))
        } else {
            Ok(())
        }
    }
}

/// Scripted parse behavior for [`MockBackend`].
#[derive(Debug, Clone)]
pub enum ParseBehavior {
    /// Resolve with the value after the delay.
    Resolve(Duration, Value),
    /// Reject with the message after the delay.
    Reject(Duration, String),
    /// Never resolve.
    Hang,
    /// Panic inside the parse task.
    Panic,
}

/// Parsing backend double with scripted behavior.
pub struct MockBackend {
    behavior: ParseBehavior,
    environment: Arc<MockEnvironment>,
    fail_environment: bool,
    fail_parser: bool,
    fault_handles: Mutex<Vec<FaultHandle>>,
}

impl MockBackend {
    pub fn new(behavior: ParseBehavior) -> Self {
        Self {
            behavior,
            environment: MockEnvironment::new(),
            fail_environment: false,
            fail_parser: false,
            fault_handles: Mutex::new(Vec::new()),
        }
    }

    /// Fail environment construction synchronously.
    pub fn failing_environment(mut self) -> Self {
        self.fail_environment = true;
        self
    }

    /// Fail parser construction synchronously.
    pub fn failing_parser(mut self) -> Self {
        self.fail_parser = true;
        self
    }

    /// The environment handed out for every job.
    pub fn environment_handle(&self) -> Arc<MockEnvironment> {
        self.environment.clone()
    }

    /// The fault handle captured at the latest parser construction.
    pub fn fault_handle(&self) -> Option<FaultHandle> {
        self.fault_handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl ParserBackend for MockBackend {
    fn environment(&self, _options: EnvOptions) -> Result<Arc<dyn Environment>> {
        if self.fail_environment {
            return Err(anyhow!("environment construction failed"));
        }
        Ok(self.environment.clone())
    }

    fn parser(
        &self,
        _environment: Arc<dyn Environment>,
        _pagination: Option<Value>,
        faults: FaultHandle,
    ) -> Result<Arc<dyn Parser>> {
        self.fault_handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(faults);
        if self.fail_parser {
            return Err(anyhow!("parser construction failed"));
        }
        Ok(Arc::new(MockParser {
            behavior: self.behavior.clone(),
        }))
    }
}

struct MockParser {
    behavior: ParseBehavior,
}

#[async_trait]
impl Parser for MockParser {
    async fn parse(&self, _args: ParseArgs) -> Result<Value> {
        match &self.behavior {
            ParseBehavior::Resolve(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(value.clone())
            }
            ParseBehavior::Reject(delay, message) => {
                tokio::time::sleep(*delay).await;
                Err(anyhow!("{message}"))
            }
            ParseBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            ParseBehavior::Panic => panic!("mock parser panic"),
        }
    }
}

/// Memory sampler returning scripted values in order, repeating the last.
pub struct ScriptedSampler {
    samples: Mutex<Vec<u64>>,
}

impl ScriptedSampler {
    pub fn new(samples: Vec<u64>) -> Self {
        let mut reversed = samples;
        reversed.reverse();
        Self {
            samples: Mutex::new(reversed),
        }
    }
}

impl crate::supervisor::MemorySampler for ScriptedSampler {
    fn sample(&self) -> Result<u64> {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        let next = if samples.len() > 1 {
            samples.pop()
        } else {
            samples.last().copied()
        };
        next.ok_or_else(|| anyhow!("no samples scripted"))
    }
}
