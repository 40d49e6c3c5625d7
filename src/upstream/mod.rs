//! Client for the third-party inventory API.
//!
//! [`UpstreamClient`] sends one GET per attempt, classifies failures into
//! [`UpstreamError`] and lets [`RetryPolicy`] decide whether to try again.
//! Successful bodies are normalized into an [`UpstreamResult`] right here, so
//! callers never see the upstream's raw envelope.

mod error;
mod retry;

use std::pin::Pin;
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info, warn};

pub use error::UpstreamError;
pub use retry::RetryPolicy;

/// Boxed, sendable future returned by [`Inventory`] implementations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Anything that can look an item up by company and barcode.
///
/// [`UpstreamClient`] is the production implementation; tests substitute
/// in-process fakes.
pub trait Inventory: Send + Sync {
    fn lookup<'a>(
        &'a self,
        company: &'a str,
        barcode: &'a str,
    ) -> BoxFuture<'a, Result<UpstreamResult, UpstreamError>>;
}

/// Candidate items returned by the inventory API, possibly none.
///
/// Only [`first`](Self::first) is authoritative for a lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamResult {
    items: Vec<Value>,
}

impl UpstreamResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Value>) -> Self {
        Self { items }
    }

    /// Extracts the `value` array from a successful response body.
    ///
    /// An empty body, a body that is not JSON, or a `value` field that is not
    /// an array all mean "no data" and produce an empty result.
    pub fn from_body(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::empty();
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut envelope)) => match envelope.remove("value") {
                Some(Value::Array(items)) => Self { items },
                _ => Self::empty(),
            },
            Ok(_) => Self::empty(),
            Err(e) => {
                debug!(error = %e, "upstream body is not JSON, treating as empty");
                Self::empty()
            }
        }
    }

    /// The item a lookup answers with. Only a JSON object counts; a `null`
    /// or scalar in first position means the upstream found nothing.
    pub fn first(&self) -> Option<&Value> {
        self.items.first().filter(|item| item.is_object())
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }
}

/// Connection settings for [`UpstreamClient`].
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_key: String,
    /// Limit for a single attempt, connect through body.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl UpstreamSettings {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
}

/// `reqwest`-backed [`Inventory`] with bounded retries.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    settings: UpstreamSettings,
}

impl UpstreamClient {
    /// # Errors
    ///
    /// [`UpstreamError::Transport`] if the HTTP client cannot be initialized
    /// (for example when no TLS backend is available).
    pub fn new(settings: UpstreamSettings) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(UpstreamError::Transport)?;
        Ok(Self { http, settings })
    }

    /// Looks up `barcode` for `company`, retrying per the configured policy.
    pub async fn fetch(
        &self,
        company: &str,
        barcode: &str,
    ) -> Result<UpstreamResult, UpstreamError> {
        if company.is_empty() || barcode.is_empty() {
            return Err(UpstreamError::InvalidQuery);
        }

        self.settings
            .retry
            .run(|attempt| self.attempt(attempt, company, barcode))
            .await
    }

    async fn attempt(
        &self,
        attempt: u32,
        company: &str,
        barcode: &str,
    ) -> Result<UpstreamResult, UpstreamError> {
        info!(attempt, company, barcode, "calling inventory API");

        let outcome: Result<UpstreamResult, UpstreamError> = async {
            let response = self
                .http
                .get(&self.settings.base_url)
                .query(&[
                    ("apikey", self.settings.api_key.as_str()),
                    ("Company", company),
                    ("keysearch", barcode),
                ])
                .header(ACCEPT, "application/json")
                .timeout(self.settings.timeout)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            let status = response.status();
            let body = response.bytes().await.map_err(|e| self.classify(e))?;

            if !status.is_success() {
                return Err(UpstreamError::from_status(
                    status.as_u16(),
                    error_message(&body),
                ));
            }
            let result = UpstreamResult::from_body(&body);
            debug!(attempt, found = !result.is_empty(), "inventory API answered");
            Ok(result)
        }
        .await;

        if let Err(err) = &outcome {
            warn!(
                attempt,
                status = err.status(),
                error = %err,
                "inventory API attempt failed"
            );
        }
        outcome
    }

    fn classify(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.settings.timeout)
        } else {
            UpstreamError::Transport(err)
        }
    }
}

impl Inventory for UpstreamClient {
    fn lookup<'a>(
        &'a self,
        company: &'a str,
        barcode: &'a str,
    ) -> BoxFuture<'a, Result<UpstreamResult, UpstreamError>> {
        Box::pin(self.fetch(company, barcode))
    }
}

/// Short description of an error body: its `message` field, or the text itself.
fn error_message(body: &[u8]) -> String {
    const MAX_LEN: usize = 200;

    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        if let Some(Value::String(message)) = map.get("message") {
            return message.clone();
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}
