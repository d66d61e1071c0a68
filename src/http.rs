//! HTTP client with per-attempt timeout and exponential backoff
//!
//! Every adapter talks to its upstream through [`HttpClient`]. A request
//! is described by an owned [`Request`] so it can be rebuilt for each
//! attempt. Transport failures and non-success statuses are retried;
//! an explicit cancellation is not.

use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use reqwest::Method;
use serde_json::Value;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// An outbound JSON request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    bearer: Option<String>,
}

impl Request {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::POST, url)
        }
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Stateless JSON-over-HTTP client shared by all adapters.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `Error::Network` if the TLS backend cannot be initialized.
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!("tempmail-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::network)?;
        Ok(Self { inner, policy })
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request`, retrying up to the policy's attempt budget.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request); never `Cancelled`.
    pub async fn send(&self, request: &Request) -> Result<Value> {
        let cancel = CancellationToken::new();
        self.request(request, self.policy.max_attempts, &cancel)
            .await
    }

    /// Send `request` with an explicit attempt budget and cancellation
    /// token.
    ///
    /// # Errors
    ///
    /// Returns the last `Network` or `Protocol` error once attempts are
    /// exhausted, `Cancelled` as soon as `cancel` fires, or `Decode` if
    /// a success body cannot be read.
    pub async fn request(
        &self,
        request: &Request,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let policy = RetryPolicy {
            max_attempts,
            ..self.policy
        };
        retry_with_backoff(&policy, cancel, |attempt| {
            debug!(
                "{} {} (attempt {}/{})",
                request.method, request.url, attempt, max_attempts
            );
            self.attempt(request)
        })
        .await
    }

    async fn attempt(&self, request: &Request) -> Result<Value> {
        let mut builder = self
            .inner
            .request(request.method.clone(), &request.url)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let exchange = async {
            let response = builder.send().await.map_err(Error::network)?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Protocol {
                    status: status.as_u16(),
                });
            }
            let text = response.text().await.map_err(Error::network)?;
            Ok(parse_body(&text))
        };

        // Dropping the future on timeout aborts the in-flight request.
        tokio::time::timeout(self.policy.timeout, exchange)
            .await
            .map_err(|_| {
                Error::network(format!(
                    "request to {} timed out after {:?}",
                    request.url, self.policy.timeout
                ))
            })?
    }
}

/// Lenient body decoding: empty is `null`, non-JSON text is kept as a
/// JSON string.
fn parse_body(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed)
        .unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent.
///
/// `op` receives the 1-indexed attempt number. Cancellation is observed
/// both while an attempt is in flight and while sleeping between
/// attempts.
///
/// # Errors
///
/// Returns the first non-retryable error, the last error once the budget
/// is spent, or `Error::Cancelled`.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let outcome = tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = op(attempt) => result,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt >= max_attempts => {
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, max_attempts, e, delay
                );
                tokio::select! {
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}
