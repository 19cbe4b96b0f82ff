//! SQLite storage for the PV sponsorship server.
//!
//! Holds users and element reservations. Access goes through the
//! schema-driven query builder in [`builder`].

mod builder;
mod db;
mod models;
mod schema;
mod users;


pub use builder::{Filter, QueryError};
pub use db::Store;
pub use models::*;
pub use pv_core::db::DatabaseError;
pub use schema::{Column, ColumnKind, Fields, Record, RowValues, Value};
pub use users::UserRepository;

/// Table holding registered users.
pub const USERS_TABLE: &str = "users";

/// Table holding one row per reserved element.
pub const ELEMENTS_TABLE: &str = "elements";
