//! Wire and domain types shared across the crate.

use serde::Deserialize;

/// The authenticated user, as reported by the server.
/// Replaced wholesale on each successful fetch, never partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Token issuance payload from register/login/refresh.
/// Transient: consumed immediately to update the session and arm the
/// refresh timer, then discarded. The refresh token itself never appears
/// here - the server delivers it as an httpOnly cookie.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
}
