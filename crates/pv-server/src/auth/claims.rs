//! Claims carried by a session token.

use serde::{Deserialize, Serialize};

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id, decimal).
    pub sub: String,
    /// Token generation of the user at issue time.
    pub tid: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl SessionClaims {
    /// The user id, if the subject is a valid integer.
    pub fn uid(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
