//! Outbound number verification.
//!
//! `LookupClient` performs exactly one HTTP call per invocation. Retrying is a
//! separate policy (`RetryPolicy`) layered on top by the caller.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::{config::Config, errors::Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupResult {
    /// Raw upstream body, verbatim.
    Success(String),
    Failure(LookupFailure),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupFailure {
    Network(String),
    Timeout,
    Status(u16),
    /// The body could not be read as text.
    Malformed(String),
}

impl LookupFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            LookupFailure::Network(_) => "network",
            LookupFailure::Timeout => "timeout",
            LookupFailure::Status(_) => "non-200",
            LookupFailure::Malformed(_) => "malformed",
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupFailure::Network(_) | LookupFailure::Timeout)
    }
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::Network(e) => write!(f, "network error: {e}"),
            LookupFailure::Timeout => write!(f, "request timed out"),
            LookupFailure::Status(code) => write!(f, "upstream returned status {code}"),
            LookupFailure::Malformed(e) => write!(f, "malformed response: {e}"),
        }
    }
}

/// Anything that can resolve a key (phone number, registration) to a lookup result.
#[async_trait]
pub trait NumberLookup: Send + Sync {
    async fn lookup(&self, number: &str) -> LookupResult;
}

#[derive(Clone, Debug)]
pub struct LookupClient {
    endpoint: String,
    api_key: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl LookupClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json,text/html;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
            http,
        })
    }

    /// Phone-number client on the configured verification endpoint.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.lookup_url.clone(),
            cfg.lookup_api_key.clone(),
            cfg.request_timeout,
        )
    }

    /// Vehicle client, when a vehicle endpoint is configured.
    pub fn vehicle_from_config(cfg: &Config) -> Result<Option<Self>> {
        cfg.vehicle_lookup_url
            .as_ref()
            .map(|url| Self::new(url.clone(), cfg.lookup_api_key.clone(), cfg.request_timeout))
            .transpose()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NumberLookup for LookupClient {
    async fn lookup(&self, number: &str) -> LookupResult {
        let sent = self
            .http
            .get(&self.endpoint)
            .query(&[("number", number)])
            .header("apikey", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => return LookupResult::Failure(classify_reqwest_error(&e)),
        };

        let status = resp.status();
        if !status.is_success() {
            return LookupResult::Failure(LookupFailure::Status(status.as_u16()));
        }

        let bytes = match resp.bytes().await {
            Ok(b) => b,
            Err(e) => return LookupResult::Failure(classify_reqwest_error(&e)),
        };

        match String::from_utf8(bytes.to_vec()) {
            Ok(body) => LookupResult::Success(body),
            Err(e) => LookupResult::Failure(LookupFailure::Malformed(e.to_string())),
        }
    }
}

fn classify_reqwest_error(e: &reqwest::Error) -> LookupFailure {
    if e.is_timeout() {
        LookupFailure::Timeout
    } else if e.is_decode() || e.is_body() {
        LookupFailure::Malformed(e.to_string())
    } else {
        LookupFailure::Network(e.to_string())
    }
}

/// Caller-side retry wrapper: transient failures are retried up to
/// `max_retries` extra times with linear backoff.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_retries: cfg.max_retries,
            backoff: Duration::from_millis(500),
        }
    }

    pub async fn run(&self, lookup: &dyn NumberLookup, number: &str) -> LookupResult {
        let mut attempt = 0u32;
        loop {
            let result = lookup.lookup(number).await;
            match &result {
                LookupResult::Failure(f) if f.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, failure = f.kind(), "retrying lookup");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                _ => return result,
            }
        }
    }
}
