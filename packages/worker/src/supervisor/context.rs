//! Per-job execution context.

use anyhow::{Context as _, Result};
use url::Url;

use crate::engine::{EnvOptions, EnvOverrides};

/// Merged options and normalized target for one job.
///
/// Owned exclusively by one supervisor invocation; never shared across
/// jobs.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub options: EnvOptions,
}

impl ExecutionContext {
    /// Merge job overrides over the process defaults and normalize the
    /// target URL into the option set.
    pub fn build(
        defaults: &EnvOptions,
        overrides: Option<&EnvOverrides>,
        url: &str,
    ) -> Result<Self> {
        let mut options = EnvOptions::merged(defaults, overrides);
        let parsed = Url::parse(url).with_context(|| format!("invalid job url: {url}"))?;
        options.url = parsed.to_string();
        Ok(Self { options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_percent_escaped() {
        let context = ExecutionContext::build(
            &EnvOptions::default(),
            None,
            "https://example.com/a page?q=über",
        )
        .unwrap();
        assert_eq!(
            context.options.url,
            "https://example.com/a%20page?q=%C3%BCber"
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        let result = ExecutionContext::build(&EnvOptions::default(), None, "not a url");
        assert!(result.is_err());
    }

    #[test]
    fn overrides_flow_into_the_context() {
        let overrides = EnvOverrides {
            snapshot: Some(true),
            ..Default::default()
        };
        let context = ExecutionContext::build(
            &EnvOptions::default(),
            Some(&overrides),
            "https://example.com",
        )
        .unwrap();
        assert!(context.options.snapshot);
    }
}
