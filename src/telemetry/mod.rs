pub mod grant;

pub use grant::{GrantKind, GrantTelemetry};
