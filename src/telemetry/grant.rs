use std::fmt;

use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;
use crate::exchange::RateLimitInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantKind {
    Password,
    RefreshToken,
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantKind::Password => write!(f, "password_limited"),
            GrantKind::RefreshToken => write!(f, "refresh_token"),
        }
    }
}

/// Structured events for a single grant exchange.
#[derive(Clone, Debug)]
pub struct GrantTelemetry {
    attempt_id: Uuid,
    kind: GrantKind,
}

impl GrantTelemetry {
    pub fn new(kind: GrantKind) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            kind,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn emit_start(&self) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            grant = %self.kind,
            "grant.start"
        );
    }

    pub fn emit_success(&self, expires_in: i64, rotated_refresh: bool) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            grant = %self.kind,
            expires_in,
            rotated_refresh,
            "grant.success"
        );
    }

    pub fn emit_rate_limit_info(&self, info: &RateLimitInfo) {
        if info.is_empty() {
            return;
        }
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            grant = %self.kind,
            limit = ?info.limit,
            remaining = ?info.remaining,
            reset = ?info.reset,
            "grant.rate_limit_headers"
        );
    }

    pub fn emit_failure(&self, error: &Error) {
        if error.is_rate_limited() {
            event!(
                Level::ERROR,
                attempt_id = %self.attempt_id,
                grant = %self.kind,
                error = %error,
                "grant.failure"
            );
        } else {
            event!(
                Level::WARN,
                attempt_id = %self.attempt_id,
                grant = %self.kind,
                error = %error,
                "grant.failure"
            );
        }
    }

    pub fn emit_fallback(&self, reason: &dyn fmt::Display) {
        event!(
            Level::WARN,
            attempt_id = %self.attempt_id,
            grant = %self.kind,
            reason = %reason,
            "grant.fallback"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_attempt_gets_its_own_id() {
        let first = GrantTelemetry::new(GrantKind::Password);
        let second = GrantTelemetry::new(GrantKind::Password);
        assert_ne!(first.attempt_id(), second.attempt_id());
    }

    #[test]
    fn grant_kinds_render_as_wire_names() {
        assert_eq!(GrantKind::Password.to_string(), "password_limited");
        assert_eq!(GrantKind::RefreshToken.to_string(), "refresh_token");
    }
}
