//! Default HTTP parsing backend - reqwest + scraper
//!
//! Fetches pages over plain HTTP and evaluates CSS-selector extraction
//! rules:
//! - `{"field": "h1"}` extracts the first match's text
//! - `{"field": {"selector": "a", "attr": "href"}}` extracts an attribute
//! - `{"field": {"selector": "li", "all": true}}` extracts every match
//!
//! Optional pagination follows a "next" link selector up to a page cap.
//!
//! Limitations:
//! - No JavaScript rendering; `actions` and `transform` are accepted by
//!   the contract but ignored here (logged)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{EnvOptions, Environment, ParseArgs, Parser, ParserBackend};
use crate::supervisor::FaultHandle;

/// Hard cap on pages visited per job, whatever the pagination rules say.
const MAX_PAGINATION_PAGES: usize = 20;

fn default_max_pages() -> usize {
    5
}

/// Pagination rules understood by this backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationRules {
    /// Selector for the link to the next page.
    selector: String,
    #[serde(default = "default_max_pages")]
    max_pages: usize,
}

/// One extraction rule: a bare selector or a detailed spec.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Rule {
    Selector(String),
    Detailed {
        selector: String,
        #[serde(default)]
        attr: Option<String>,
        #[serde(default)]
        all: bool,
    },
}

/// HTTP backend building environments and parsers over a shared client.
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl ParserBackend for HttpBackend {
    fn environment(&self, options: EnvOptions) -> Result<Arc<dyn Environment>> {
        Ok(Arc::new(HttpEnvironment {
            client: self.client.clone(),
            options,
        }))
    }

    fn parser(
        &self,
        environment: Arc<dyn Environment>,
        pagination: Option<Value>,
        _faults: FaultHandle,
    ) -> Result<Arc<dyn Parser>> {
        let pagination = match pagination {
            Some(value) => Some(
                serde_json::from_value::<PaginationRules>(value)
                    .context("invalid pagination rules")?,
            ),
            None => None,
        };
        Ok(Arc::new(HttpParser {
            environment,
            pagination,
        }))
    }
}

struct HttpEnvironment {
    client: reqwest::Client,
    options: EnvOptions,
}

#[async_trait]
impl Environment for HttpEnvironment {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.options.user_agent)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {} for {}", status, url);
        }

        response.text().await.context("Failed to read response body")
    }

    fn options(&self) -> &EnvOptions {
        &self.options
    }

    async fn tear_down(&self) -> Result<()> {
        debug!(url = %self.options.url, "tearing down http environment");
        Ok(())
    }
}

struct HttpParser {
    environment: Arc<dyn Environment>,
    pagination: Option<PaginationRules>,
}

#[async_trait]
impl Parser for HttpParser {
    async fn parse(&self, args: ParseArgs) -> Result<Value> {
        if args.actions.is_some() {
            warn!("actions are not supported by the http backend, ignoring");
        }
        if args.transform.is_some() {
            warn!("transforms are not supported by the http backend, ignoring");
        }

        let rules = parse_rules(&args.rules)?;
        let next_selector = self.pagination.as_ref().map(|p| p.selector.as_str());
        let max_pages = self
            .pagination
            .as_ref()
            .map(|p| p.max_pages.min(MAX_PAGINATION_PAGES))
            .unwrap_or(1)
            .max(1);

        let mut url = self.environment.options().url.clone();
        let mut records: Vec<Value> = Vec::new();

        for page in 0..max_pages {
            debug!(url = %url, page = page, "fetching page");
            let html = self.environment.fetch(&url).await?;
            let (record, next) = extract(&html, &rules, next_selector, &url)?;
            records.push(record);

            match next {
                Some(next_url) if page + 1 < max_pages => url = next_url,
                _ => break,
            }
        }

        if records.len() == 1 {
            Ok(records.pop().unwrap_or(Value::Null))
        } else {
            Ok(Value::Array(records))
        }
    }
}

fn parse_rules(rules: &Value) -> Result<Vec<(String, Rule)>> {
    if rules.is_null() {
        return Ok(Vec::new());
    }
    let object = rules
        .as_object()
        .ok_or_else(|| anyhow!("rules must be an object of field -> selector"))?;

    object
        .iter()
        .map(|(name, value)| {
            let rule: Rule = serde_json::from_value(value.clone())
                .with_context(|| format!("invalid rule for field '{name}'"))?;
            Ok((name.clone(), rule))
        })
        .collect()
}

/// Evaluate all rules against one page. Synchronous on purpose: the parsed
/// document is not `Send` and must never live across an await point.
fn extract(
    html: &str,
    rules: &[(String, Rule)],
    next_selector: Option<&str>,
    base_url: &str,
) -> Result<(Value, Option<String>)> {
    let document = Html::parse_document(html);

    let mut record = Map::new();
    for (name, rule) in rules {
        record.insert(name.clone(), apply_rule(&document, rule)?);
    }

    let next = next_selector.and_then(|s| find_next_url(&document, s, base_url));
    Ok((Value::Object(record), next))
}

fn apply_rule(document: &Html, rule: &Rule) -> Result<Value> {
    let (selector_str, attr, all) = match rule {
        Rule::Selector(s) => (s.as_str(), None, false),
        Rule::Detailed {
            selector,
            attr,
            all,
        } => (selector.as_str(), attr.as_deref(), *all),
    };

    let selector = Selector::parse(selector_str)
        .map_err(|e| anyhow!("invalid css selector '{selector_str}': {e}"))?;

    let mut values = document.select(&selector).filter_map(|element| match attr {
        Some(attr) => element.value().attr(attr).map(str::to_string),
        None => Some(element.text().collect::<String>().trim().to_string()),
    });

    if all {
        Ok(Value::Array(values.map(Value::String).collect()))
    } else {
        Ok(values.next().map(Value::String).unwrap_or(Value::Null))
    }
}

fn find_next_url(document: &Html, selector_str: &str, base_url: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;
    let base = url::Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"
        <html><head><title>Shop</title></head><body>
            <h1> Widgets </h1>
            <ul>
                <li class="item">Alpha</li>
                <li class="item">Beta</li>
            </ul>
            <a class="next" href="/page/2">Next</a>
        </body></html>
    "#;

    #[test]
    fn bare_selector_extracts_first_text() {
        let rules = parse_rules(&json!({ "title": "h1" })).unwrap();
        let (record, _) = extract(PAGE, &rules, None, "https://example.com").unwrap();
        assert_eq!(record, json!({ "title": "Widgets" }));
    }

    #[test]
    fn detailed_rule_extracts_attr_and_all() {
        let rules = parse_rules(&json!({
            "next": { "selector": "a.next", "attr": "href" },
            "items": { "selector": "li.item", "all": true }
        }))
        .unwrap();
        let (record, _) = extract(PAGE, &rules, None, "https://example.com").unwrap();
        assert_eq!(
            record,
            json!({ "next": "/page/2", "items": ["Alpha", "Beta"] })
        );
    }

    #[test]
    fn missing_match_yields_null() {
        let rules = parse_rules(&json!({ "price": ".price" })).unwrap();
        let (record, _) = extract(PAGE, &rules, None, "https://example.com").unwrap();
        assert_eq!(record, json!({ "price": null }));
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let rules = parse_rules(&json!({ "broken": ":::nope" })).unwrap();
        let result = extract(PAGE, &rules, None, "https://example.com");
        assert!(result.is_err());
    }

    #[test]
    fn next_url_resolves_against_base() {
        let (_, next) = extract(PAGE, &[], Some("a.next"), "https://example.com/page/1").unwrap();
        assert_eq!(next.as_deref(), Some("https://example.com/page/2"));
    }

    #[test]
    fn null_rules_mean_empty_record() {
        let rules = parse_rules(&Value::Null).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn non_object_rules_rejected() {
        assert!(parse_rules(&json!("h1")).is_err());
        assert!(parse_rules(&json!({ "bad": 42 })).is_err());
    }

    #[tokio::test]
    async fn parser_paginates_through_mock_environment() {
        use crate::testing::MockEnvironment;

        let environment = MockEnvironment::with_pages(vec![
            (
                "https://example.com/".to_string(),
                r#"<h1>One</h1><a class="next" href="/2">n</a>"#.to_string(),
            ),
            (
                "https://example.com/2".to_string(),
                "<h1>Two</h1>".to_string(),
            ),
        ]);

        let backend = HttpBackend::new().unwrap();
        let barrier = crate::supervisor::FaultBarrier::new();
        let parser = backend
            .parser(
                environment,
                Some(json!({ "selector": "a.next", "maxPages": 5 })),
                barrier.handle(),
            )
            .unwrap();

        let result = parser
            .parse(ParseArgs {
                rules: json!({ "title": "h1" }),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result, json!([{ "title": "One" }, { "title": "Two" }]));
    }
}
