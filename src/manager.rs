use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::errors::Error;
use crate::exchange::{PasswordGrantForm, RefreshGrantForm, TokenResponse, exchange};
use crate::masking::mask_secret;
use crate::telemetry::{GrantKind, GrantTelemetry};
use crate::token::{ExpiryPolicy, TokenAction, TokenSnapshot, TokenState};

const PASSWORD_GRANT: &str = "password_limited";
const REFRESH_GRANT: &str = "refresh_token";

/// Why a refresh ended up as a password grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    NoRefreshToken,
    Rejected(StatusCode),
    Timeout(Duration),
    Transport(String),
}

impl FallbackReason {
    fn from_error(err: &Error) -> Self {
        match err {
            Error::RequestFailed { status, .. } => FallbackReason::Rejected(*status),
            Error::Timeout(after) => FallbackReason::Timeout(*after),
            other => FallbackReason::Transport(other.to_string()),
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoRefreshToken => write!(f, "no refresh token cached"),
            FallbackReason::Rejected(status) => write!(f, "refresh rejected with status {status}"),
            FallbackReason::Timeout(after) => write!(f, "refresh timed out after {after:?}"),
            FallbackReason::Transport(msg) => write!(f, "refresh failed: {msg}"),
        }
    }
}

/// Which path a refresh took.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshPath {
    RefreshedDirectly,
    FellBackToInitial(FallbackReason),
}

/// Owns the tokens for one credential and keeps them fresh.
///
/// Grant exchanges are serialized: a caller that finds the cached token stale
/// takes the grant lock, checks the state again and only then talks to the
/// token endpoint, so callers queued behind it reuse its result.
pub struct TokenManager {
    config: Config,
    http: Client,
    policy: ExpiryPolicy,
    clock: Arc<dyn Clock>,
    state: RwLock<TokenState>,
    grant_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(config: Config) -> Result<Self, Error> {
        // Exchanges carry their own deadline; see `exchange::exchange`.
        let http = Client::builder().build()?;
        Ok(Self::with_parts(config, http, Arc::new(SystemClock)))
    }

    /// Builds a manager around an existing HTTP client and clock.
    pub fn with_parts(config: Config, http: Client, clock: Arc<dyn Clock>) -> Self {
        let policy = ExpiryPolicy::new(config.expiry_buffer());
        Self {
            config,
            http,
            policy,
            clock,
            state: RwLock::new(TokenState::default()),
            grant_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn snapshot(&self) -> TokenSnapshot {
        self.state.read().await.snapshot()
    }

    /// Runs the password grant and replaces the cached tokens.
    pub async fn acquire_initial_token(&self) -> Result<(), Error> {
        let _lock = self.grant_lock.lock().await;
        self.password_grant().await.map(|_| ())
    }

    /// Runs the refresh grant, falling back to the password grant once when
    /// the refresh token is missing or no longer accepted.
    pub async fn refresh_access_token(&self) -> Result<RefreshPath, Error> {
        let _lock = self.grant_lock.lock().await;
        self.refresh_grant().await.map(|(path, _)| path)
    }

    /// Returns an access token that is not within the expiry buffer,
    /// refreshing or re-acquiring it first when needed.
    ///
    /// A token freshly issued by a grant is handed out as-is, even when the
    /// server gave it an `expires_in` of zero or less. Such a token is never
    /// cached as usable, so the next call runs another grant.
    pub async fn get_valid_access_token(&self) -> Result<String, Error> {
        {
            let state = self.state.read().await;
            if let TokenAction::UseCached(token) = self.policy.decide(&state, self.clock.now()) {
                return Ok(token);
            }
        }

        let _lock = self.grant_lock.lock().await;
        let action = {
            let state = self.state.read().await;
            self.policy.decide(&state, self.clock.now())
        };
        match action {
            TokenAction::UseCached(token) => {
                debug!("token renewed by a concurrent caller");
                Ok(token)
            }
            TokenAction::Refresh => self.refresh_grant().await.map(|(_, token)| token),
            TokenAction::AcquireInitial => self.password_grant().await,
        }
    }

    async fn password_grant(&self) -> Result<String, Error> {
        let client = self.config.client_credential()?;
        let user = self.config.user_credential()?;
        let form = PasswordGrantForm {
            grant_type: PASSWORD_GRANT,
            client_id: &client.id,
            client_secret: mask_secret(&client.secret, &client.id),
            username: &user.id,
            password: mask_secret(&user.secret, &user.id),
            scope: self.config.scope(),
        };
        let telemetry = GrantTelemetry::new(GrantKind::Password);
        self.run_grant(&form, &telemetry).await
    }

    async fn refresh_grant(&self) -> Result<(RefreshPath, String), Error> {
        let refresh_token = self.state.read().await.refresh_token().map(str::to_owned);
        let Some(refresh_token) = refresh_token else {
            info!("no refresh token cached; using password grant");
            let token = self.password_grant().await?;
            return Ok((RefreshPath::FellBackToInitial(FallbackReason::NoRefreshToken), token));
        };

        let client = self.config.client_credential()?;
        let form = RefreshGrantForm {
            grant_type: REFRESH_GRANT,
            client_id: &client.id,
            client_secret: mask_secret(&client.secret, &client.id),
            refresh_token: &refresh_token,
        };
        let telemetry = GrantTelemetry::new(GrantKind::RefreshToken);
        match self.run_grant(&form, &telemetry).await {
            Ok(token) => Ok((RefreshPath::RefreshedDirectly, token)),
            Err(err) if err.allows_reacquire() => {
                let reason = FallbackReason::from_error(&err);
                telemetry.emit_fallback(&reason);
                let token = self.password_grant().await?;
                Ok((RefreshPath::FellBackToInitial(reason), token))
            }
            Err(err) => Err(err),
        }
    }

    async fn run_grant<F: Serialize>(
        &self,
        form: &F,
        telemetry: &GrantTelemetry,
    ) -> Result<String, Error> {
        telemetry.emit_start();
        // Expiries count from before the request was sent.
        let now = self.clock.now();
        let result = exchange(
            &self.http,
            self.config.token_url(),
            form,
            self.config.request_timeout(),
            now,
            telemetry,
        )
        .await;
        match result {
            Ok(resp) => {
                telemetry.emit_success(resp.expires_in, resp.refresh_token.is_some());
                Ok(self.store(resp, now).await)
            }
            Err(err) => {
                telemetry.emit_failure(&err);
                Err(err)
            }
        }
    }

    async fn store(&self, resp: TokenResponse, now: Timestamp) -> String {
        let access_token = resp.access_token.clone();
        let next = TokenState::issued(
            resp.access_token,
            resp.expires_in,
            resp.refresh_token,
            resp.refresh_token_expires_in,
            now,
        );
        *self.state.write().await = next;
        access_token
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
