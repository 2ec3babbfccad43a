use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;

/// Seconds the authorization server asked us to wait, when it said so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAfter(Option<u64>);

impl RetryAfter {
    pub fn seconds(secs: u64) -> Self {
        Self(Some(secs))
    }

    pub fn unknown() -> Self {
        Self(None)
    }

    pub fn as_secs(&self) -> Option<u64> {
        self.0
    }
}

impl fmt::Display for RetryAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(secs) => write!(f, "{secs}s"),
            None => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token request failed: status={status} body='{body}'")]
    RequestFailed { status: StatusCode, body: String },
    #[error("rate limited by authorization server: retry_after={retry_after} body='{body}'")]
    RateLimited { retry_after: RetryAfter, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid token response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("token exchange timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Failures that mean the refresh token is no longer usable and a
    /// password grant should be attempted instead.
    pub fn allows_reacquire(&self) -> bool {
        matches!(
            self,
            Error::RequestFailed { .. } | Error::Transport(_) | Error::Decode(_) | Error::Timeout(_)
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Retry hint carried by a rate-limit error.
    pub fn retry_after(&self) -> Option<RetryAfter> {
        match self {
            Error::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_never_allows_reacquire() {
        let err = Error::RateLimited {
            retry_after: RetryAfter::seconds(120),
            body: String::new(),
        };
        assert!(!err.allows_reacquire());
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after().and_then(|r| r.as_secs()), Some(120));
    }

    #[test]
    fn request_failures_allow_reacquire() {
        let err = Error::RequestFailed {
            status: StatusCode::UNAUTHORIZED,
            body: "invalid_grant".into(),
        };
        assert!(err.allows_reacquire());
        assert!(Error::Timeout(Duration::from_secs(10)).allows_reacquire());
        assert!(!Error::Configuration("missing".into()).allows_reacquire());
    }

    #[test]
    fn unknown_retry_after_displays_unknown() {
        let err = Error::RateLimited {
            retry_after: RetryAfter::unknown(),
            body: "Rate limit exceeded".into(),
        };
        assert!(err.to_string().contains("retry_after=unknown"));
    }
}
