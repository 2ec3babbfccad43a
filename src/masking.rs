//! Secret masking required by the authorization server.

use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Masks `secret` with an identifier (client id or username).
///
/// The identifier is trimmed and lower-cased, appended to the secret without a
/// separator, hashed with SHA-256 and returned as standard base64.
pub fn mask_secret(secret: &str, id: &str) -> String {
    let normalized_id = id.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(normalized_id.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}
