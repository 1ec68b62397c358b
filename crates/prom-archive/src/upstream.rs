use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::Span;
use crate::error::{Error, Result};

pub const MAX_REQUEST_RETRIES: u32 = 5;
pub const CONNECTION_RETRY_WAIT: Duration = Duration::from_secs(1);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct LabelValuesResponse {
    data: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    result: Vec<serde_json::Value>,
}

/// Outcome of a single query attempt. The retry driver pattern-matches on
/// this instead of branching on status codes inline.
enum Attempt {
    Data(Vec<serde_json::Value>),
    Degraded(String),
    Fatal(u16, String),
}

/// Seam between the orchestrator and the query API, so backup runs can be
/// driven against a scripted source in tests.
pub trait MetricSource {
    fn validate_metric(&mut self, name: &str) -> Result<()>;
    fn fetch_window(&mut self, name: &str, chunk: Span, starts: &[i64]) -> Result<Option<String>>;
}

pub struct MetricFetcher {
    client: reqwest::blocking::Client,
    url: String,
    all_metrics: Option<BTreeSet<String>>,
    connection_errors: u32,
    retry_wait: Duration,
}

impl MetricFetcher {
    pub fn new(url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = token {
            let value = reqwest::header::HeaderValue::from_str(&format!("bearer {token}"))
                .map_err(|e| Error::config(format!("bearer token is not a valid header: {e}")))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        // Certificate verification stays off to match the deployments this
        // tool points at; a trusted-CA mode would be a behavior change.
        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(true)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            all_metrics: None,
            connection_errors: 0,
            retry_wait: CONNECTION_RETRY_WAIT,
        })
    }

    pub fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }

    /// Exhausted-retry events seen so far. Diagnostics only, never control
    /// flow.
    pub fn connection_errors(&self) -> u32 {
        self.connection_errors
    }

    /// All metric names the upstream knows about, fetched once and cached
    /// for the life of the fetcher.
    pub fn all_metrics(&mut self) -> Result<&BTreeSet<String>> {
        if self.all_metrics.is_none() {
            let fetched = self.list_metric_names()?;
            self.all_metrics = Some(fetched);
        }
        Ok(self.all_metrics.get_or_insert_with(BTreeSet::new))
    }

    /// Drop the cached name set and fetch it again.
    pub fn refresh_metrics(&mut self) -> Result<&BTreeSet<String>> {
        self.all_metrics = None;
        self.all_metrics()
    }

    fn list_metric_names(&self) -> Result<BTreeSet<String>> {
        let url = format!("{}/api/v1/label/__name__/values", self.url);
        let res = self.client.get(&url).send()?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(Error::upstream(status.as_u16(), body));
        }
        let parsed: LabelValuesResponse = res.json()?;
        Ok(parsed.data.into_iter().collect())
    }

    fn query_chunk(&self, name: &str, chunk: Span, start: i64) -> Attempt {
        let url = format!("{}/api/v1/query", self.url);
        let query = format!("{}[{}]", name, chunk.label());
        let time = start.to_string();
        let res = match self
            .client
            .get(&url)
            .query(&[("query", query.as_str()), ("time", time.as_str())])
            .send()
        {
            Ok(res) => res,
            Err(e) => return Attempt::Degraded(e.to_string()),
        };
        let status = res.status().as_u16();
        match status {
            200 => match res.json::<QueryResponse>() {
                Ok(body) => Attempt::Data(body.data.result),
                Err(e) => Attempt::Fatal(status, format!("unexpected response body: {e}")),
            },
            504 => Attempt::Degraded("gateway timeout".to_string()),
            _ => Attempt::Fatal(status, res.text().unwrap_or_default()),
        }
    }

    /// One chunk with bounded retries. `Ok(None)` means the graceful path
    /// ran out of attempts and the caller should skip the window.
    fn fetch_chunk(
        &mut self,
        name: &str,
        chunk: Span,
        start: i64,
    ) -> Result<Option<Vec<serde_json::Value>>> {
        let mut tries = 0;
        loop {
            tries += 1;
            match self.query_chunk(name, chunk, start) {
                Attempt::Data(values) => return Ok(Some(values)),
                Attempt::Degraded(reason) => {
                    if tries >= MAX_REQUEST_RETRIES {
                        self.connection_errors += 1;
                        warn!(
                            "chunk for {} at {} degraded after {} attempts: {}",
                            name, start, tries, reason
                        );
                        return Ok(None);
                    }
                    debug!("retry {} for {} at {}: {}", tries, name, start, reason);
                    thread::sleep(self.retry_wait);
                }
                Attempt::Fatal(status, body) => {
                    if tries >= MAX_REQUEST_RETRIES {
                        self.connection_errors += 1;
                        return Err(Error::upstream(status, body));
                    }
                    debug!("retry {} for {} at {}: HTTP {}", tries, name, start, status);
                    thread::sleep(self.retry_wait);
                }
            }
        }
    }
}

impl MetricSource for MetricFetcher {
    fn validate_metric(&mut self, name: &str) -> Result<()> {
        if !self.all_metrics()?.contains(name) {
            return Err(Error::invalid_metric(name));
        }
        Ok(())
    }

    fn fetch_window(&mut self, name: &str, chunk: Span, starts: &[i64]) -> Result<Option<String>> {
        self.validate_metric(name)?;
        let mut data: Vec<serde_json::Value> = Vec::new();
        for &start in starts {
            match self.fetch_chunk(name, chunk, start)? {
                Some(mut values) => data.append(&mut values),
                None => return Ok(None),
            }
        }
        Ok(Some(serde_json::to_string(&data)?))
    }
}
