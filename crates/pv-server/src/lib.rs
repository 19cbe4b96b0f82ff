//! PV sponsorship server: element reservations, signed sessions and user
//! management behind a JSON API.

pub mod api;
pub mod auth;
pub mod reservations;
pub mod storage;
