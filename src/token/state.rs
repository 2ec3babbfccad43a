use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AccessToken {
    pub(crate) value: String,
    pub(crate) expires_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RefreshToken {
    pub(crate) value: String,
    pub(crate) expires_at: Option<Timestamp>,
}

/// Tokens issued by the most recent successful grant.
///
/// An access token and its expiry are stored together, and a refresh token is
/// only ever present alongside the access token it was issued with. A grant
/// replaces the whole value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenState {
    pub(crate) access: Option<AccessToken>,
    pub(crate) refresh: Option<RefreshToken>,
}

impl TokenState {
    /// State produced by a grant response received at `now`.
    ///
    /// Lifetimes of zero or less yield an expiry of `now`, i.e. already stale.
    pub fn issued(
        access_token: String,
        expires_in: i64,
        refresh_token: Option<String>,
        refresh_expires_in: Option<i64>,
        now: Timestamp,
    ) -> Self {
        Self {
            access: Some(AccessToken {
                value: access_token,
                expires_at: expiry_from(now, expires_in),
            }),
            refresh: refresh_token.map(|value| RefreshToken {
                value,
                expires_at: refresh_expires_in.map(|secs| expiry_from(now, secs)),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access.as_ref().map(|a| a.value.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh.as_ref().map(|r| r.value.as_str())
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        TokenSnapshot {
            access_token: self.access.as_ref().map(|a| a.value.clone()),
            access_expires_at: self.access.as_ref().map(|a| a.expires_at),
            refresh_token: self.refresh.as_ref().map(|r| r.value.clone()),
            refresh_expires_at: self.refresh.as_ref().and_then(|r| r.expires_at),
        }
    }
}

/// Read-only copy of the cached tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenSnapshot {
    pub access_token: Option<String>,
    pub access_expires_at: Option<Timestamp>,
    pub refresh_token: Option<String>,
    pub refresh_expires_at: Option<Timestamp>,
}

fn expiry_from(now: Timestamp, secs: i64) -> Timestamp {
    if secs <= 0 {
        return now;
    }
    now.checked_add(SignedDuration::from_secs(secs))
        .unwrap_or(Timestamp::MAX)
}
