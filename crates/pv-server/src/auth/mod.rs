//! Authentication for the PV sponsorship server.
//!
//! Signed session tokens carrying a per-user revocation counter, argon2id
//! password hashing and the session cookie transport.

pub mod claims;
pub mod cookie;
pub mod identity;
pub mod password;
pub mod session;

pub use claims::SessionClaims;
pub use cookie::CookieSettings;
pub use identity::{Identity, IdentityStore, Role};
pub use session::{AuthError, IssuedSession, SessionAuthority, SessionError, VerifiedSession};
