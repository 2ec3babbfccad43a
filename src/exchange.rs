//! One round trip to the token endpoint: form encoding, timeout, response
//! classification and decoding.

use std::time::Duration;

use jiff::Timestamp;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Error, RetryAfter};
use crate::telemetry::GrantTelemetry;

const RATE_LIMIT_MARKER: &str = "rate limit exceeded";
const RATELIMIT_LIMIT: &str = "ratelimit-limit";
const RATELIMIT_REMAINING: &str = "ratelimit-remaining";
const RATELIMIT_RESET: &str = "ratelimit-reset";

#[derive(Serialize)]
pub(crate) struct PasswordGrantForm<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: String,
    pub username: &'a str,
    pub password: String,
    pub scope: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshGrantForm<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: String,
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
}

/// Informational rate-limit headers. Logged only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };
        Self {
            limit: read(RATELIMIT_LIMIT),
            remaining: read(RATELIMIT_REMAINING),
            reset: read(RATELIMIT_RESET),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset.is_none()
    }
}

/// POSTs `form` to `url` and returns the decoded token response.
pub(crate) async fn exchange<F>(
    http: &Client,
    url: &str,
    form: &F,
    timeout: Duration,
    now: Timestamp,
    telemetry: &GrantTelemetry,
) -> Result<TokenResponse, Error>
where
    F: Serialize + ?Sized,
{
    let round_trip = async {
        let resp = http
            .post(url)
            .header("User-Agent", concat!("iracing-auth/", env!("CARGO_PKG_VERSION")))
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await?;
        Ok::<_, Error>((status, headers, body))
    };
    let (status, headers, body) = tokio::time::timeout(timeout, round_trip)
        .await
        .map_err(|_| Error::Timeout(timeout))??;

    telemetry.emit_rate_limit_info(&RateLimitInfo::from_headers(&headers));
    debug!(status = %status, body_len = body.len(), "token endpoint responded");

    let body = classify_response(status, &headers, body, now)?;
    Ok(serde_json::from_str(&body)?)
}

/// Maps an HTTP outcome onto success, `RateLimited` or `RequestFailed`.
/// On success the body is handed back for decoding.
pub(crate) fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
    now: Timestamp,
) -> Result<String, Error> {
    if status.is_success() {
        return Ok(body);
    }
    let retry_after = headers
        .get(RETRY_AFTER)
        .map(|v| parse_retry_after(v.to_str().unwrap_or_default(), now));
    let rejected = status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED;
    let marked = body.to_lowercase().contains(RATE_LIMIT_MARKER);
    if status == StatusCode::TOO_MANY_REQUESTS || (rejected && (marked || retry_after.is_some())) {
        return Err(Error::RateLimited {
            retry_after: retry_after.unwrap_or_else(RetryAfter::unknown),
            body,
        });
    }
    Err(Error::RequestFailed { status, body })
}

/// `Retry-After` is either delay-seconds or an HTTP-date.
pub(crate) fn parse_retry_after(value: &str, now: Timestamp) -> RetryAfter {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return RetryAfter::seconds(secs);
    }
    match jiff::fmt::rfc2822::parse(value) {
        Ok(at) => {
            let secs = at.timestamp().as_second() - now.as_second();
            RetryAfter::seconds(secs.max(0) as u64)
        }
        Err(_) => RetryAfter::unknown(),
    }
}
