//! User management endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, instrument};

use super::error::ApiError;
use super::extract::{AdminUser, CurrentUser, JsonBody, QueryParams};
use super::routes::AppState;
use crate::auth::Role;
use crate::auth::password::hash_new_password;
use crate::storage::{QueryError, UserSummary};

/// Longest accepted user name, in characters.
pub const MAX_NAME_CHARS: usize = 64;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub uid: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

fn validate_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_CHARS {
        return Err(ApiError::Validation(format!(
            "User name must be between 1 and {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name)
}

fn unknown_user(uid: i64) -> ApiError {
    ApiError::NotFound(format!("Unknown user {uid}"))
}

/// `GET /users`
pub async fn list(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    Ok(Json(state.users.list().await?))
}

/// `POST /users` - create a regular user.
#[instrument(skip_all, fields(admin = admin.uid))]
pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(request): JsonBody<NewUserRequest>,
) -> Result<Response, ApiError> {
    let name = validate_name(&request.name)?;
    let hash = hash_new_password(request.password).await?;

    let uid = match state.users.create(name, &hash, Role::User).await {
        Ok(uid) => uid,
        Err(QueryError::Constraint(_)) => {
            return Err(ApiError::Conflict(format!("User name {name:?} is already taken")));
        }
        Err(e) => return Err(e.into()),
    };
    info!(uid, "User created");

    let users = state.users.list().await?;
    Ok((StatusCode::CREATED, Json(users)).into_response())
}

/// `PATCH /users?uid=N` - reset a user's password, revoking their sessions.
/// An admin resetting their own password is signed out like any other user.
#[instrument(skip_all, fields(admin = admin.uid, uid = query.uid))]
pub async fn reset_password(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    QueryParams(query): QueryParams<UserQuery>,
    JsonBody(request): JsonBody<PasswordRequest>,
) -> Result<Response, ApiError> {
    let hash = hash_new_password(request.password).await?;
    if !state.users.set_password(query.uid, &hash).await? {
        return Err(unknown_user(query.uid));
    }
    info!("Password reset by admin");

    let users = Json(state.users.list().await?);
    if query.uid == admin.uid {
        let removal = state.cookies.removal_cookie();
        return Ok(([(SET_COOKIE, removal.to_string())], users).into_response());
    }
    Ok(users.into_response())
}

/// `DELETE /users?uid=N`
#[instrument(skip_all, fields(admin = admin.uid, uid = query.uid))]
pub async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    QueryParams(query): QueryParams<UserQuery>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    if query.uid == admin.uid {
        return Err(ApiError::Validation("Cannot delete your own account".to_string()));
    }
    if !state.users.delete(query.uid).await? {
        return Err(unknown_user(query.uid));
    }
    info!("User deleted");

    Ok(Json(state.users.list().await?))
}

/// `PATCH /user/password` - change the caller's own password. Every session
/// of the caller, this one included, stops being valid.
#[instrument(skip_all, fields(uid = caller.uid))]
pub async fn change_own_password(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(request): JsonBody<PasswordRequest>,
) -> Result<Response, ApiError> {
    let hash = hash_new_password(request.password).await?;
    if !state.users.set_password(caller.uid, &hash).await? {
        return Err(unknown_user(caller.uid));
    }
    info!("Password changed");

    let removal = state.cookies.removal_cookie();
    let headers = [(SET_COOKIE, removal.to_string())];
    Ok((StatusCode::NO_CONTENT, headers).into_response())
}
