//! Session token issuance, verification and authorization.
//!
//! A token is valid only while its `tid` claim equals the user's current
//! token generation. Bumping the generation revokes every token issued
//! before, without any server-side denylist.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pv_core::db::unix_timestamp;
use tracing::debug;

use super::claims::SessionClaims;
use super::identity::{Identity, IdentityStore};
use crate::storage::QueryError;

/// Why a credential failed verification.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Malformed session token")]
    Malformed,

    #[error("Session token signature rejected")]
    BadSignature,

    #[error("Session token expired")]
    Expired,

    #[error("Failed to sign session token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Outcome of authorizing a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] QueryError),
}

/// A freshly signed session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    /// Expiry as a unix timestamp.
    pub expires_at: i64,
}

/// Claims of a token whose signature and expiry checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedSession {
    pub uid: i64,
    pub generation: i64,
}

/// Issues and validates HS256 session tokens.
#[derive(Clone)]
pub struct SessionAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl SessionAuthority {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    pub const fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sign a token for `uid` at token generation `generation`.
    pub fn issue(&self, uid: i64, generation: i64) -> Result<IssuedSession, SessionError> {
        let now = unix_timestamp();
        let exp = now.saturating_add(self.ttl_secs);

        let claims = SessionClaims {
            sub: uid.to_string(),
            tid: generation,
            iat: now,
            exp,
        };

        let header = Header::new(Algorithm::HS256);
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(SessionError::Signing)?;
        Ok(IssuedSession {
            token,
            expires_at: exp,
        })
    }

    /// Check signature, algorithm and expiry of a token.
    pub fn verify(&self, token: &str) -> Result<VerifiedSession, SessionError> {
        let key = &self.decoding_key;
        let data = jsonwebtoken::decode::<SessionClaims>(token, key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    SessionError::BadSignature
                }
                _ => SessionError::Malformed,
            })?;

        let uid = data.claims.uid().ok_or(SessionError::Malformed)?;
        Ok(VerifiedSession {
            uid,
            generation: data.claims.tid,
        })
    }

    /// Resolve the live identity behind a credential.
    ///
    /// A missing credential, any verification failure, an unknown user and a
    /// stale token generation all yield [`AuthError::Unauthenticated`].
    pub async fn authorize_user<S: IdentityStore + Sync>(
        &self,
        store: &S,
        credential: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let token = credential.ok_or(AuthError::Unauthenticated)?;
        let session = self.verify(token).map_err(|e| {
            debug!(error = %e, "Session rejected");
            AuthError::Unauthenticated
        })?;

        let identity = store
            .identity(session.uid)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if identity.generation != session.generation {
            debug!(uid = session.uid, "Session generation is stale");
            return Err(AuthError::Unauthenticated);
        }
        Ok(identity)
    }

    /// Like [`Self::authorize_user`], additionally requiring the admin role.
    pub async fn authorize_admin<S: IdentityStore + Sync>(
        &self,
        store: &S,
        credential: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let identity = self.authorize_user(store, credential).await?;
        if !identity.role.is_admin() {
            return Err(AuthError::Forbidden);
        }
        Ok(identity)
    }
}
