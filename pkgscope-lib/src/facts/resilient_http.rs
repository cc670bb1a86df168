//! Resilient HTTP request utilities.
//!
//! Every outbound call made by the gateways goes through [`ResilientClient::request`],
//! which applies a fixed per-attempt timeout, retries transient failures with
//! capped exponential backoff, and caps the number of in-flight requests per
//! origin. The retry schedule lives in [`RetryPolicy`] and the decision whether
//! to retry is the pure function [`decide`], so both can be tested without a
//! network.

use super::throttler::Throttler;
use core::time::Duration;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use url::Url;

const LOG_TARGET: &str = "      http";

/// HTTP statuses that indicate a transient upstream condition.
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Upper bound on how much of an error body is kept for diagnostics.
const MAX_ERROR_BODY_BYTES: usize = 2048;

/// Exponential backoff schedule with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries on top of the original attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts a call may make.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before retry number `retry` (1-based).
    ///
    /// `min(max_delay, base_delay * backoff_multiplier^(retry - 1))`
    #[must_use]
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }

        if secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }

        Duration::from_secs_f64(secs).min(self.max_delay)
    }
}

/// How an individual attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connection refused/reset/aborted or name resolution failure.
    Connect,
    /// The attempt did not complete within the per-call timeout.
    Timeout,
    /// The upstream answered with a non-success status.
    Status(StatusCode),
    /// The upstream answered but the payload could not be read or decoded.
    Malformed,
    /// The request could not be built or sent for a non-transient reason.
    Request,
}

impl FailureClass {
    #[must_use]
    pub fn is_retryable(self) -> bool {
        match self {
            Self::Connect | Self::Timeout => true,
            Self::Status(status) => RETRYABLE_STATUSES.contains(&status.as_u16()),
            Self::Malformed | Self::Request => false,
        }
    }

    fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }

        if error.is_connect() || is_transient_io(error) {
            return Self::Connect;
        }

        if error.is_decode() || error.is_body() {
            return Self::Malformed;
        }

        Self::Request
    }
}

/// Walk the error chain looking for an I/O error that signals a dropped connection.
fn is_transient_io(error: &reqwest::Error) -> bool {
    use std::io::ErrorKind;

    let mut source: Option<&(dyn core::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::NotConnected
                    | ErrorKind::BrokenPipe
                    | ErrorKind::TimedOut
                    | ErrorKind::UnexpectedEof
            );
        }
        source = err.source();
    }

    false
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Decide whether to retry after `attempts_made` attempts ended with `failure`.
#[must_use]
pub fn decide(policy: &RetryPolicy, attempts_made: u32, failure: FailureClass) -> RetryDecision {
    if !failure.is_retryable() || attempts_made >= policy.max_attempts() {
        return RetryDecision::GiveUp;
    }

    RetryDecision::RetryAfter(policy.delay_before_retry(attempts_made))
}

/// Bookkeeping for one outbound call across its attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Number of attempts dispatched so far.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.policy.max_attempts()
    }

    const fn begin_attempt(&mut self) {
        self.attempt += 1;
    }

    #[must_use]
    pub fn decide(&self, failure: FailureClass) -> RetryDecision {
        decide(&self.policy, self.attempt, failure)
    }
}

/// Error surfaced once a call has given up.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP {status} from {url} after {attempts} attempt(s)")]
    Status {
        status: StatusCode,
        url: String,
        attempts: u32,
        body: String,
    },

    #[error("request to {url} timed out after {attempts} attempt(s)")]
    Timeout { url: String, attempts: u32 },

    #[error("could not connect to {url} after {attempts} attempt(s)")]
    Connect {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {url}: {detail}")]
    Malformed { url: String, detail: String },

    #[error("could not send request to {url}")]
    Request {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

impl HttpError {
    /// Number of attempts made before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Status { attempts, .. }
            | Self::Timeout { attempts, .. }
            | Self::Connect { attempts, .. }
            | Self::Request { attempts, .. } => *attempts,
            Self::Malformed { .. } => 1,
        }
    }

    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Status { status, .. } => FailureClass::Status(*status),
            Self::Timeout { .. } => FailureClass::Timeout,
            Self::Connect { .. } => FailureClass::Connect,
            Self::Malformed { .. } => FailureClass::Malformed,
            Self::Request { .. } => FailureClass::Request,
        }
    }

    /// Body of a non-success response, if any was captured.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

/// A request description that can be replayed for every attempt.
#[derive(Clone)]
pub struct RequestSpec {
    name: &'static str,
    method: Method,
    url: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    bearer: Option<String>,
    basic: Option<(String, String)>,
    json: Option<serde_json::Value>,
}

impl core::fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("basic", &self.basic.as_ref().map(|_| "<redacted>"))
            .field("json", &self.json)
            .finish()
    }
}

impl RequestSpec {
    /// `name` identifies the call in logs.
    #[must_use]
    pub fn get(name: &'static str, url: impl Into<String>) -> Self {
        Self {
            name,
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            bearer: None,
            basic: None,
            json: None,
        }
    }

    #[must_use]
    pub fn post_json(name: &'static str, url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            json: Some(body),
            ..Self::get(name, url)
        }
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    #[must_use]
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    #[must_use]
    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic = Some((user.into(), password.into()));
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    fn origin(&self) -> String {
        Url::parse(&self.url).map_or_else(|_| self.url.clone(), |url| url.origin().ascii_serialization())
    }

    fn to_builder(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut builder = client.request(self.method.clone(), &self.url);

        for (name, value) in &self.headers {
            builder = builder.header(name.clone(), value.clone());
        }

        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }

        if let Some((user, password)) = &self.basic {
            builder = builder.basic_auth(user, Some(password));
        }

        if let Some(body) = &self.json {
            builder = builder.json(body);
        }

        builder
    }
}

/// Transport tunables for [`ResilientClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub slow_call_threshold: Duration,
    pub max_connections_per_host: usize,
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(3),
            slow_call_threshold: Duration::from_secs(5),
            max_connections_per_host: 50,
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(60),
            user_agent: concat!("pkgscope/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// A response whose body has been received in full.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: Vec<u8>,
}

impl Reply {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Why a single attempt failed.
enum AttemptFailure {
    Timeout,
    Transport(FailureClass, reqwest::Error),
    Status(StatusCode, String),
}

impl AttemptFailure {
    fn transport(error: reqwest::Error) -> Self {
        Self::Transport(FailureClass::from_reqwest(&error), error)
    }

    const fn class(&self) -> FailureClass {
        match self {
            Self::Timeout => FailureClass::Timeout,
            Self::Transport(class, _) => *class,
            Self::Status(status, _) => FailureClass::Status(*status),
        }
    }
}

/// HTTP client shared by every gateway.
///
/// Cloning is cheap; all clones share the same connection pool and the same
/// per-origin concurrency ceilings.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    client: reqwest::Client,
    settings: Arc<HttpSettings>,
    throttlers: Arc<Mutex<HashMap<String, Arc<Throttler>>>>,
}

impl ResilientClient {
    pub fn new(settings: HttpSettings) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .pool_max_idle_per_host(settings.max_idle_per_host)
            .pool_idle_timeout(settings.idle_timeout)
            .build()?;

        Ok(Self {
            client,
            settings: Arc::new(settings),
            throttlers: Arc::default(),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    /// Issue a request, retrying transient failures.
    ///
    /// Each attempt, body included, must finish within the per-call timeout and
    /// holds its origin's concurrency slot until the body is read. Any
    /// non-success status is returned as [`HttpError::Status`] once the retry
    /// budget for it (if any) is spent.
    pub async fn request(&self, spec: &RequestSpec) -> Result<Reply, HttpError> {
        let throttler = self.throttler_for(spec);
        let started = Instant::now();
        let mut state = RetryState::new(self.settings.retry);

        let result = loop {
            state.begin_attempt();

            let outcome = {
                let _permit = throttler.acquire().await;
                self.attempt(spec).await
            };

            let failure = match outcome {
                Ok(reply) => break Ok(reply),
                Err(failure) => failure,
            };

            let class = failure.class();
            match state.decide(class) {
                RetryDecision::RetryAfter(delay) => {
                    log::debug!(
                        target: LOG_TARGET,
                        "retrying {} {} after {class:?} (attempt {}, delay {}ms)",
                        spec.name,
                        spec.url,
                        state.attempt() + 1,
                        delay.as_millis(),
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    if class.is_retryable() {
                        log::warn!(
                            target: LOG_TARGET,
                            "giving up on {} {} after {} attempt(s): {class:?}",
                            spec.name,
                            spec.url,
                            state.attempt(),
                        );
                    }
                    break Err(give_up(spec, failure, state.attempt()));
                }
            }
        };

        let elapsed = started.elapsed();
        if elapsed > self.settings.slow_call_threshold {
            log::warn!(
                target: LOG_TARGET,
                "slow call: {} {} took {}ms over {} attempt(s)",
                spec.name,
                spec.url,
                elapsed.as_millis(),
                state.attempt(),
            );
        }

        result
    }

    /// Issue a request and decode the JSON body.
    pub async fn request_json<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T, HttpError> {
        let reply = self.request(spec).await?;
        serde_json::from_slice(&reply.body).map_err(|e| HttpError::Malformed {
            url: spec.url.clone(),
            detail: e.to_string(),
        })
    }

    async fn attempt(&self, spec: &RequestSpec) -> Result<Reply, AttemptFailure> {
        tokio::time::timeout(self.settings.request_timeout, self.exchange(spec))
            .await
            .unwrap_or(Err(AttemptFailure::Timeout))
    }

    /// Send once and read the whole body.
    async fn exchange(&self, spec: &RequestSpec) -> Result<Reply, AttemptFailure> {
        let resp = spec.to_builder(&self.client).send().await.map_err(AttemptFailure::transport)?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.map(truncate_body).unwrap_or_default();
            return Err(AttemptFailure::Status(status, body));
        }

        let body = resp.bytes().await.map_err(AttemptFailure::transport)?;
        Ok(Reply { status, body: body.to_vec() })
    }

    fn throttler_for(&self, spec: &RequestSpec) -> Arc<Throttler> {
        let origin = spec.origin();
        let mut throttlers = self.throttlers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            throttlers
                .entry(origin)
                .or_insert_with(|| Throttler::new(self.settings.max_connections_per_host)),
        )
    }
}

fn give_up(spec: &RequestSpec, failure: AttemptFailure, attempts: u32) -> HttpError {
    let url = spec.url.clone();
    match failure {
        AttemptFailure::Timeout => HttpError::Timeout { url, attempts },
        AttemptFailure::Transport(FailureClass::Connect | FailureClass::Timeout, source) => HttpError::Connect { url, attempts, source },
        AttemptFailure::Transport(FailureClass::Malformed, source) => HttpError::Malformed {
            url,
            detail: source.to_string(),
        },
        AttemptFailure::Transport(_, source) => HttpError::Request { url, attempts, source },
        AttemptFailure::Status(status, body) => HttpError::Status {
            status,
            url,
            attempts,
            body,
        },
    }
}

fn truncate_body(mut text: String) -> String {
    if text.len() > MAX_ERROR_BODY_BYTES {
        let mut cut = MAX_ERROR_BODY_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}
