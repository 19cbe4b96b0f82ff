//! Error responses for API handlers.
//!
//! Every failure is rendered as `{"error": "<message>"}`. Store and other
//! internal failures are logged with their detail and answered with a
//! generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::auth::password::PasswordError;
use crate::auth::{AuthError, SessionError};
use crate::reservations::ReservationError;
use crate::storage::QueryError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    /// Detail is logged, never sent to the client.
    #[error("{0}")]
    Internal(String),

    #[error("Service unavailable")]
    Unavailable,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        Self::Unauthenticated("Not authenticated".to_string())
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::NotFound(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(detail) => {
                error!(error = %detail, "Request failed");
                INTERNAL_MESSAGE.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(ErrorBody { error: &message })).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthenticated => Self::unauthenticated(),
            AuthError::Forbidden => Self::Forbidden,
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Policy => Self::Validation(e.to_string()),
            PasswordError::Hash(detail) => Self::Internal(detail),
        }
    }
}

impl From<ReservationError> for ApiError {
    fn from(e: ReservationError) -> Self {
        match e {
            ReservationError::InvalidElementId(_) | ReservationError::InvalidHolderName => {
                Self::Validation(e.to_string())
            }
            ReservationError::Conflict { .. } => Self::Conflict(e.to_string()),
            ReservationError::NotFound { .. } => Self::NotFound(e.to_string()),
            ReservationError::Store(e) => e.into(),
        }
    }
}
