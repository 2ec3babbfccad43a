//! Bearer tokens for the iRacing password-limited OAuth2 flow.
//!
//! [`TokenManager`] obtains tokens with the `password_limited` grant, caches
//! them, renews them through the `refresh_token` grant shortly before they
//! expire and falls back to a fresh password grant when a refresh is refused.
//! [`AuthenticatedClient`] attaches the current token to outbound requests.

pub mod clock;
pub mod config;
pub mod errors;
pub mod exchange;
mod manager;
pub mod masking;
mod request;
pub mod telemetry;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, Credential};
pub use errors::{Error, RetryAfter};
pub use manager::{FallbackReason, RefreshPath, TokenManager};
pub use masking::mask_secret;
pub use request::{AuthenticatedClient, FetchOptions};
pub use token::TokenSnapshot;
