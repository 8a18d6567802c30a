//! Parsing collaborator contracts and the default HTTP backend.
//!
//! The supervisor does not know how parsing works. It builds an
//! environment from merged options, hands it to a parser, and bounds the
//! parse's lifetime. Backends that drive real browser automation plug in
//! behind the same traits.

mod http;
mod options;

pub use http::HttpBackend;
pub use options::{EnvOptions, EnvOverrides, Viewport, DEFAULT_USER_AGENT, DEFAULT_VIEWPORT};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::supervisor::FaultHandle;

/// The constructed execution environment backing one parse attempt.
///
/// The success path is responsible for its own resources; the supervisor
/// tears an environment down only when the job ends in an error
/// (timeout included).
#[async_trait]
pub trait Environment: Send + Sync {
    /// Fetch a page through this environment.
    async fn fetch(&self, url: &str) -> Result<String>;

    /// The merged options this environment was built with.
    fn options(&self) -> &EnvOptions;

    /// Release the resources held by this environment.
    async fn tear_down(&self) -> Result<()>;
}

/// Arguments for one parse run, owned so the parse can move onto its own task.
#[derive(Debug, Clone, Default)]
pub struct ParseArgs {
    pub actions: Option<Value>,
    pub rules: Value,
    pub transform: Option<Value>,
    pub rules_params: Option<Value>,
}

/// The parsing collaborator for one job.
#[async_trait]
pub trait Parser: Send + Sync {
    async fn parse(&self, args: ParseArgs) -> Result<Value>;
}

/// Factory for environments and parsers.
pub trait ParserBackend: Send + Sync {
    /// Construct a fresh environment for one job.
    fn environment(&self, options: EnvOptions) -> Result<Arc<dyn Environment>>;

    /// Build a parser bound to `environment`. Errors raised outside the
    /// awaited parse call are reported through `faults`.
    fn parser(
        &self,
        environment: Arc<dyn Environment>,
        pagination: Option<Value>,
        faults: FaultHandle,
    ) -> Result<Arc<dyn Parser>>;
}
