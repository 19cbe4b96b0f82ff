//! Session endpoints: welcome, login and logout.

use axum::Json;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::error::ApiError;
use super::extract::{JsonBody, SessionCredential};
use super::routes::AppState;
use crate::auth::password::check_password;
use crate::auth::{AuthError, Identity};

const WRONG_LOGIN: &str = "Unknown user or wrong password";

/// Whether the caller is logged in, and as whom.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub logged_in: bool,
}

impl SessionStatus {
    pub fn logged_in(identity: Identity) -> Self {
        Self {
            uid: Some(identity.uid),
            name: Some(identity.name),
            logged_in: true,
        }
    }

    pub const fn logged_out() -> Self {
        Self {
            uid: None,
            name: None,
            logged_in: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "user")]
    pub name: String,
    pub password: String,
}

/// `GET /welcome` - report the session state; a stale cookie is cleared.
#[instrument(skip_all)]
pub async fn welcome(
    State(state): State<AppState>,
    SessionCredential(credential): SessionCredential,
) -> Result<Response, ApiError> {
    if credential.is_none() {
        return Ok(Json(SessionStatus::logged_out()).into_response());
    }

    match state
        .sessions
        .authorize_user(&state.users, credential.as_deref())
        .await
    {
        Ok(identity) => Ok(Json(SessionStatus::logged_in(identity)).into_response()),
        Err(AuthError::Unauthenticated | AuthError::Forbidden) => {
            let removal = state.cookies.removal_cookie();
            let headers = [(SET_COOKIE, removal.to_string())];
            Ok((headers, Json(SessionStatus::logged_out())).into_response())
        }
        Err(AuthError::Store(e)) => Err(e.into()),
    }
}

/// `POST /login` - check credentials and set the session cookie.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let name = request.name.trim();
    let user = if name.is_empty() {
        None
    } else {
        state.users.find_by_name(name).await?
    };

    let stored = user.as_ref().map(|u| u.password.clone());
    let matches = check_password(request.password, stored).await?;
    let Some(user) = user.filter(|_| matches) else {
        warn!(name, "Failed login");
        return Err(ApiError::Unauthenticated(WRONG_LOGIN.to_string()));
    };

    let session = state.sessions.issue(user.uid, user.tid)?;
    let cookie = state.cookies.session_cookie(&session.token);
    info!(uid = user.uid, "User logged in");

    let status = SessionStatus {
        uid: Some(user.uid),
        name: Some(user.name),
        logged_in: true,
    };
    Ok(([(SET_COOKIE, cookie.to_string())], Json(status)).into_response())
}

/// `GET /logout` - drop the session cookie.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let removal = state.cookies.removal_cookie();
    let headers = [(SET_COOKIE, removal.to_string())];
    (headers, Json(SessionStatus::logged_out()))
}
