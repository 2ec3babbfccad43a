//! Credentials and endpoint settings for a [`TokenManager`](crate::TokenManager).

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Error;

pub const DEFAULT_CLIENT_ID: &str = "iracing-data-api";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.iracing.com/oauth2/token";
pub const DEFAULT_SCOPE: &str = "iracing.auth";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(30);

/// An identifier and the secret that goes with it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: String,
    pub secret: String,
}

impl Credential {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct Config {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token_url: Option<String>,
    pub scope: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub expiry_buffer_ms: Option<u64>,
}

impl Config {
    /// Builds a config from the three required secrets; everything else defaults.
    pub fn from_values(
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_secret: Some(client_secret.into()),
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Reads a JSON config file.
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Reads `IRACING_*` environment variables. Missing values stay unset and
    /// are reported when a grant is first attempted.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            client_id: var("IRACING_CLIENT_ID"),
            client_secret: var("IRACING_CLIENT_SECRET"),
            username: var("IRACING_USERNAME"),
            password: var("IRACING_PASSWORD"),
            token_url: var("IRACING_TOKEN_URL"),
            ..Self::default()
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(millis(timeout));
        self
    }

    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer_ms = Some(millis(buffer));
        self
    }

    pub fn client_id(&self) -> &str {
        self.client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(DEFAULT_CLIENT_ID)
    }

    pub fn token_url(&self) -> &str {
        self.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_ms
            .map(Duration::from_millis)
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn expiry_buffer(&self) -> Duration {
        self.expiry_buffer_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_EXPIRY_BUFFER)
    }

    /// Client credential used by both grants.
    pub fn client_credential(&self) -> Result<Credential, Error> {
        let secret = required(&self.client_secret, "client_secret")?;
        Ok(Credential::new(self.client_id(), secret))
    }

    /// Resource-owner credential used by the password grant.
    pub fn user_credential(&self) -> Result<Credential, Error> {
        let username = required(&self.username, "username")?;
        let password = required(&self.password, "password")?;
        Ok(Credential::new(username, password))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn required(value: &Option<String>, name: &str) -> Result<String, Error> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.clone()),
        _ => Err(Error::Configuration(format!("missing required value '{name}'"))),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("client_id", &self.client_id())
            .field("client_secret", &redact(&self.client_secret))
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("token_url", &self.token_url())
            .field("scope", &self.scope())
            .field("request_timeout", &self.request_timeout())
            .field("expiry_buffer", &self.expiry_buffer())
            .finish()
    }
}
