use super::resilient_http::HttpError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Why an upstream call did not produce data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FailureKind {
    /// The upstream explicitly reported that the resource does not exist.
    NotFound,

    /// Network failure, timeout, or a transient status that survived every retry.
    UpstreamUnavailable,

    /// A non-retryable rejection or a payload that could not be understood.
    UpstreamRejected,

    /// The call could not be made because a prerequisite is absent.
    MissingCapability,
}

/// The failure marker carried in place of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamFailure {
    pub kind: FailureKind,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl UpstreamFailure {
    #[must_use]
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            http_status: None,
        }
    }

    #[must_use]
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, reason)
    }

    #[must_use]
    pub fn missing_capability(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::MissingCapability, reason)
    }

    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::UpstreamRejected, reason)
    }

    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.http_status = Some(status.as_u16());
        self
    }

    /// Classify a client error into the failure taxonomy.
    ///
    /// `reason` is used verbatim when the upstream did not supply a better message.
    #[must_use]
    pub fn from_http(error: &HttpError, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match error.status() {
            Some(StatusCode::NOT_FOUND) => Self::not_found(reason).with_status(StatusCode::NOT_FOUND),
            Some(status) if error.class().is_retryable() => {
                Self::new(FailureKind::UpstreamUnavailable, reason).with_status(status)
            }
            Some(status) => Self::rejected(reason).with_status(status),
            None if error.class().is_retryable() => Self::new(FailureKind::UpstreamUnavailable, reason),
            None => Self::rejected(reason),
        }
    }
}

impl core::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "{}: {} (HTTP {status})", self.kind, self.reason),
            None => write!(f, "{}: {}", self.kind, self.reason),
        }
    }
}

/// Outcome of exactly one upstream call.
///
/// Serialized as `{"ok": ...}` or `{"failed": {...}}` so that callers can render
/// partial data without guessing which fields are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpstreamResult<T> {
    /// The call succeeded.
    Ok(T),

    /// The call did not produce data.
    Failed(UpstreamFailure),
}

impl<T> UpstreamResult<T> {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns `true` if the upstream reported that the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Failed(failure) if failure.kind == FailureKind::NotFound)
    }

    /// Returns a reference to the contained data if `Ok`, otherwise `None`.
    #[must_use]
    pub const fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Ok(data) => Some(data),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&UpstreamFailure> {
        match self {
            Self::Ok(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> UpstreamResult<U> {
        match self {
            Self::Ok(data) => UpstreamResult::Ok(f(data)),
            Self::Failed(failure) => UpstreamResult::Failed(failure),
        }
    }

    /// Convert a client outcome. A 404 is reported with `not_found` as its reason;
    /// every other failure carries the client error text.
    pub fn from_http(result: Result<T, HttpError>, not_found: &str) -> Self {
        match result {
            Ok(data) => Self::Ok(data),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => UpstreamFailure::from_http(&e, not_found).into(),
            Err(e) => UpstreamFailure::from_http(&e, e.to_string()).into(),
        }
    }
}

impl<T> From<UpstreamFailure> for UpstreamResult<T> {
    fn from(failure: UpstreamFailure) -> Self {
        Self::Failed(failure)
    }
}
