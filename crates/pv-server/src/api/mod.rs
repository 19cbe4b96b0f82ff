//! HTTP API: thin axum handlers over the session authority, the user
//! repository and the reservation manager.

pub mod elements;
pub mod error;
pub mod extract;
pub mod health;
pub mod routes;
pub mod users;
pub mod welcome;

pub use error::ApiError;
pub use routes::{AppState, build_router};
