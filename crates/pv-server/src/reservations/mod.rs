//! Reservation manager: element id grammar, inventory cache and the
//! reserve/modify/release operations.

pub mod cache;
pub mod element_id;
pub mod manager;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;

pub use cache::{InventoryCache, Snapshot};
pub use element_id::{ElementCatalog, ElementId};
pub use manager::{ReservationError, ReservationManager};
