//! Request extractors: session credential, authenticated callers and
//! JSON/query inputs with errors rendered as [`ApiError`].

use std::convert::Infallible;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;

use super::error::ApiError;
use super::routes::AppState;
use crate::auth::Identity;

/// Raw session token from the request cookie, if any.
pub struct SessionCredential(pub Option<String>);

impl FromRequestParts<AppState> for SessionCredential {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.cookies.extract_credential(&parts.headers)))
    }
}

/// Caller with a valid, current session.
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = state.cookies.extract_credential(&parts.headers);
        let identity = state
            .sessions
            .authorize_user(&state.users, credential.as_deref())
            .await?;
        Ok(Self(identity))
    }
}

/// Caller with a valid session and the admin role.
pub struct AdminUser(pub Identity);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = state.cookies.extract_credential(&parts.headers);
        let identity = state
            .sessions
            .authorize_admin(&state.users, credential.as_deref())
            .await?;
        Ok(Self(identity))
    }
}

/// `Json<T>` whose rejection is a 400 validation error.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query<T>` whose rejection is a 400 validation error.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}
