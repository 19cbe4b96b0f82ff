//! Live identity of an authenticated caller.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::storage::QueryError;

/// Account role, stored explicitly on the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// The user a request acts as, as currently recorded in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: i64,
    pub name: String,
    pub role: Role,
    /// Current token generation (`tid`).
    pub generation: i64,
}

/// Source of live identities for session authorization.
pub trait IdentityStore {
    fn identity(
        &self,
        uid: i64,
    ) -> impl Future<Output = Result<Option<Identity>, QueryError>> + Send;
}
