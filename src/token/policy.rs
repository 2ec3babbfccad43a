use std::time::Duration;

use jiff::{SignedDuration, Timestamp};

use crate::config::DEFAULT_EXPIRY_BUFFER;

use super::TokenState;

/// What the manager should do to hand out a usable access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenAction {
    UseCached(String),
    Refresh,
    AcquireInitial,
}

/// Decides whether cached tokens are still usable.
#[derive(Clone, Debug)]
pub struct ExpiryPolicy {
    /// Tokens closer than this to their expiry are treated as expired.
    buffer: SignedDuration,
}

impl ExpiryPolicy {
    pub fn new(buffer: Duration) -> Self {
        Self {
            buffer: SignedDuration::try_from(buffer).unwrap_or(SignedDuration::MAX),
        }
    }

    /// `now < expires_at - buffer`
    pub fn is_usable(&self, expires_at: Timestamp, now: Timestamp) -> bool {
        match expires_at.checked_sub(self.buffer) {
            Ok(deadline) => now < deadline,
            Err(_) => false,
        }
    }

    pub fn decide(&self, state: &TokenState, now: Timestamp) -> TokenAction {
        if let Some(access) = &state.access
            && self.is_usable(access.expires_at, now)
        {
            return TokenAction::UseCached(access.value.clone());
        }
        // A refresh token without a known expiry is not trusted here.
        if let Some(refresh) = &state.refresh
            && let Some(expires_at) = refresh.expires_at
            && self.is_usable(expires_at, now)
        {
            return TokenAction::Refresh;
        }
        TokenAction::AcquireInitial
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_BUFFER)
    }
}
