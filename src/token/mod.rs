mod policy;
mod state;

pub use policy::{ExpiryPolicy, TokenAction};
pub use state::{TokenSnapshot, TokenState};
