//! Router and shared application state.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use pv_core::Config;
use tower_http::trace::TraceLayer;

use super::{elements, health, users, welcome};
use crate::auth::{CookieSettings, SessionAuthority};
use crate::reservations::{ElementCatalog, InventoryCache, ReservationManager};
use crate::storage::{Store, UserRepository};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub users: UserRepository,
    pub sessions: Arc<SessionAuthority>,
    pub reservations: ReservationManager,
    pub cookies: Arc<CookieSettings>,
}

impl AppState {
    /// Wire every component from a validated config.
    pub fn new(store: Store, config: &Config) -> Result<Self, regex::Error> {
        let catalog = ElementCatalog::from_config(&config.elements)?;
        let cache = InventoryCache::new(config.cache_expiration());
        let secret = config.session.secret.as_bytes();
        let sessions = SessionAuthority::new(secret, config.session_ttl());
        let cookies = CookieSettings {
            name: config.session.cookie_name.clone(),
            secure: config.session.secure_cookie,
            max_age_secs: sessions.ttl_secs(),
        };

        Ok(Self {
            users: UserRepository::new(store.clone()),
            reservations: ReservationManager::new(store.clone(), catalog, cache),
            sessions: Arc::new(sessions),
            cookies: Arc::new(cookies),
            store,
        })
    }
}

/// Build the API router, nested under `prefix` (empty or `/` for the root).
pub fn build_router(state: AppState, prefix: &str) -> Router {
    let api = Router::new()
        .route("/welcome", get(welcome::welcome))
        .route("/login", post(welcome::login))
        .route("/logout", get(welcome::logout))
        .route(
            "/elements",
            get(elements::list)
                .post(elements::reserve)
                .patch(elements::modify)
                .delete(elements::release),
        )
        .route(
            "/users",
            get(users::list)
                .post(users::create)
                .patch(users::reset_password)
                .delete(users::delete),
        )
        .route("/user/password", patch(users::change_own_password))
        .route("/health", get(health::health));

    let prefix = prefix.trim_matches('/');
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{prefix}"), api)
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
