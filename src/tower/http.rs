//! HTTP transport for Tower REST API calls
//!
//! One [`Request`] in, one [`Response`] out: auth and user agent are injected
//! on every attempt, transient failures are retried per [`RetryPolicy`], and
//! every attempt and backoff sleep races the caller's [`CallScope`].

use super::auth::AccessToken;
use super::error::{ApiError, Result, TowerError};
use super::payload::{self, Body, Payload};
use super::retry::{is_retryable_error, is_retryable_status, RetryPolicy};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use std::future::Future;
use std::io::{Read, Seek};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum length of a body to log (to avoid flooding the log with uploads)
const MAX_LOG_BODY_LENGTH: usize = 4096;
/// Maximum length of an error body in debug logs
const MAX_LOG_ERROR_LENGTH: usize = 200;
/// Bound on a single HTTP attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Truncate a body for logging and strip non-printable characters.
fn sanitize_for_log(body: &str, limit: usize) -> String {
    let truncated = if body.len() > limit {
        let mut end = limit;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(
        |c: char| c.is_control() && c != '\n' && c != '\t',
        "",
    )
}

/// Render a body for trace logs, pretty-printing JSON.
fn format_body(body: &[u8], content_type: Option<&str>) -> String {
    let is_json = content_type.map_or(false, payload::is_json_content_type);
    if is_json {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return sanitize_for_log(&pretty, MAX_LOG_BODY_LENGTH);
            }
        }
    }
    sanitize_for_log(&String::from_utf8_lossy(body), MAX_LOG_BODY_LENGTH)
}

/// Render headers for trace logs, leaving out `Authorization`.
fn format_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .filter(|(name, _)| *name != AUTHORIZATION)
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A single logical API call. Immutable once built, so every retry sends
/// identical bytes.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter; repeated keys are kept in order.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Scope to a workspace with the `workspaceId` query parameter.
    pub fn workspace(self, workspace_id: i64) -> Self {
        self.query("workspaceId", workspace_id)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = payload::encode_json(value)?;
        Ok(self)
    }

    /// Attach a single-file multipart upload.
    pub fn file<R: Read + Seek>(mut self, source: R, filename: &str) -> Result<Self> {
        self.body = payload::encode_multipart(source, filename)?;
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Resolve against the API base URL, keeping any base path prefix.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| TowerError::InvalidConfig(format!("invalid request URL {joined}: {e}")))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub url: Url,
}

impl Response {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Status ≤ 399 decodes the body; anything above is an [`ApiError`].
    pub fn into_payload(self) -> Result<Payload> {
        if self.status.as_u16() > 399 {
            return Err(TowerError::Api(ApiError::from_body(
                self.status,
                &self.body,
                self.url.as_str(),
            )));
        }
        let content_type = self.content_type().map(str::to_owned);
        payload::decode(self.body, content_type.as_deref())
    }
}

/// Cancellation and deadline shared by every attempt of a call.
#[derive(Debug, Clone, Default)]
pub struct CallScope {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Keep the earliest of the existing and the new deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn check(&self, url: &Url) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TowerError::Cancelled {
                url: url.to_string(),
            });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TowerError::Timeout {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Run `fut` unless cancellation or the deadline fires first.
    async fn guard<F: Future>(&self, url: &Url, fut: F) -> Result<F::Output> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TowerError::Cancelled { url: url.to_string() }),
            _ = deadline => Err(TowerError::Timeout { url: url.to_string() }),
            output = fut => Ok(output),
        }
    }
}

/// HTTP client wrapper for Tower API calls
#[derive(Debug, Clone)]
pub struct TowerHttpClient {
    client: Client,
    base_url: Url,
    token: AccessToken,
    user_agent: HeaderValue,
    retry: RetryPolicy,
}

impl TowerHttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: Url,
        token: AccessToken,
        user_agent: &str,
        attempt_timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(attempt_timeout)
            .build()
            .map_err(|e| TowerError::InvalidConfig(format!("failed to create HTTP client: {e}")))?;
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|_| TowerError::InvalidConfig(format!("invalid user agent: {user_agent}")))?;

        Ok(Self {
            client,
            base_url,
            token,
            user_agent,
            retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn headers(&self, request: &Request) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.token.header_value()?);
        headers.insert(USER_AGENT, self.user_agent.clone());
        if let Some(content_type) = request.body().content_type() {
            let value = HeaderValue::from_str(content_type)
                .map_err(|_| TowerError::Encode(format!("invalid content type {content_type}")))?;
            headers.insert(CONTENT_TYPE, value);
        }
        Ok(headers)
    }

    /// Execute one logical request, retrying transient failures.
    ///
    /// Error statuses that survive the retry policy are returned as a
    /// [`Response`]; only transport failures, cancellation and deadline
    /// expiry are errors here.
    pub async fn execute(&self, request: &Request, scope: &CallScope) -> Result<Response> {
        let url = request.url(&self.base_url)?;
        let headers = self.headers(request)?;
        let method = request.method().clone();
        let mut attempt: u32 = 0;

        loop {
            scope.check(&url)?;

            tracing::debug!("{} {} (attempt {})", method, url, attempt + 1);
            tracing::trace!(
                "[{}] {}\n{}\n{}",
                method,
                url,
                format_headers(&headers),
                request
                    .body()
                    .bytes()
                    .map(|b| format_body(b, request.body().content_type()))
                    .unwrap_or_default()
            );

            let mut builder = self
                .client
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(data) = request.body().bytes() {
                builder = builder.body(data.clone());
            }

            let exchange = async {
                let response = builder.send().await?;
                let status = response.status();
                let headers = response.headers().clone();
                let body = response.bytes().await?;
                Ok::<_, reqwest::Error>((status, headers, body))
            };

            match scope.guard(&url, exchange).await? {
                Ok((status, response_headers, body)) => {
                    let response = Response {
                        status,
                        headers: response_headers,
                        body,
                        url: url.clone(),
                    };
                    tracing::trace!(
                        "[{}] {}\n{}\n{}",
                        status.as_u16(),
                        url,
                        format_headers(&response.headers),
                        format_body(&response.body, response.content_type())
                    );

                    if is_retryable_status(status) && self.retry.allows_retry(&method, attempt) {
                        tracing::warn!(
                            "{} {} returned {}, retrying: {}",
                            method,
                            url,
                            status,
                            sanitize_for_log(
                                &String::from_utf8_lossy(&response.body),
                                MAX_LOG_ERROR_LENGTH
                            )
                        );
                        scope
                            .guard(&url, tokio::time::sleep(self.retry.delay(attempt)))
                            .await?;
                        attempt += 1;
                        continue;
                    }

                    if status.as_u16() > 399 {
                        tracing::debug!(
                            "API error: {} - {}",
                            status,
                            sanitize_for_log(
                                &String::from_utf8_lossy(&response.body),
                                MAX_LOG_ERROR_LENGTH
                            )
                        );
                    }
                    return Ok(response);
                }
                Err(error) => {
                    if is_retryable_error(&error) && self.retry.allows_retry(&method, attempt) {
                        tracing::warn!("{} {} failed, retrying: {}", method, url, error);
                        scope
                            .guard(&url, tokio::time::sleep(self.retry.delay(attempt)))
                            .await?;
                        attempt += 1;
                        continue;
                    }
                    return Err(TowerError::Transport {
                        url: url.to_string(),
                        source: error,
                    });
                }
            }
        }
    }

    /// Execute and decode, turning statuses above 399 into [`ApiError`]s.
    pub async fn send(&self, request: &Request, scope: &CallScope) -> Result<Payload> {
        self.execute(request, scope).await?.into_payload()
    }
}
