//! Reservation operations over the `elements` table.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::cache::{InventoryCache, Snapshot};
use super::element_id::ElementCatalog;
use crate::auth::Identity;
use crate::storage::{
    ELEMENTS_TABLE, ElementKey, ElementRow, Filter, HolderUpdate, QueryError, Store,
};

/// Longest accepted holder name, in characters.
pub const MAX_HOLDER_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Invalid element id {0:?}")]
    InvalidElementId(String),

    #[error("Holder name must be at most {MAX_HOLDER_CHARS} characters")]
    InvalidHolderName,

    #[error("Element {mid} is already reserved")]
    Conflict { mid: String },

    #[error("Element {mid} is not reserved")]
    NotFound { mid: String },

    #[error(transparent)]
    Store(#[from] QueryError),
}

/// Enforces reservation invariants and keeps the inventory cache coherent.
///
/// Invalidate-then-write is not atomic: a reader racing a mutation may cache
/// the pre-write state until the next mutation or expiry.
#[derive(Clone)]
pub struct ReservationManager {
    store: Store,
    catalog: Arc<ElementCatalog>,
    cache: InventoryCache,
}

impl ReservationManager {
    pub fn new(store: Store, catalog: ElementCatalog, cache: InventoryCache) -> Self {
        Self {
            store,
            catalog: Arc::new(catalog),
            cache,
        }
    }

    /// Current reservations, from the cache or rebuilt from the store.
    pub async fn list_reservations(&self) -> Result<Snapshot, ReservationError> {
        if let Some(snapshot) = self.cache.get().await {
            return Ok(snapshot);
        }

        let rows: Vec<ElementRow> = self.store.select(ELEMENTS_TABLE, &Filter::all()).await?;
        let reservations: BTreeMap<_, _> = rows.into_iter().map(|r| (r.mid, r.name)).collect();
        let snapshot: Snapshot = Arc::new(reservations);
        debug!(count = snapshot.len(), "Rebuilt reservation snapshot");

        self.cache.store(Arc::clone(&snapshot)).await;
        Ok(snapshot)
    }

    /// Reserve an unreserved element for `holder` (`None` is anonymous).
    #[instrument(skip(self, holder, caller), fields(uid = caller.uid))]
    pub async fn reserve(
        &self,
        mid: &str,
        holder: Option<&str>,
        caller: &Identity,
    ) -> Result<Snapshot, ReservationError> {
        self.check_id(mid)?;
        let holder = normalize_holder(holder)?;

        if self.list_reservations().await?.contains_key(mid) {
            return Err(ReservationError::Conflict {
                mid: mid.to_string(),
            });
        }

        self.cache.invalidate().await;
        let row = ElementRow {
            mid: mid.to_string(),
            name: holder,
        };
        match self.store.insert(ELEMENTS_TABLE, &row).await {
            Ok(_) => {}
            Err(QueryError::Constraint(_)) => {
                return Err(ReservationError::Conflict {
                    mid: mid.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(mid, "Element reserved");
        self.list_reservations().await
    }

    /// Change the holder of a reserved element.
    #[instrument(skip(self, holder, caller), fields(uid = caller.uid))]
    pub async fn modify(
        &self,
        mid: &str,
        holder: Option<&str>,
        caller: &Identity,
    ) -> Result<Snapshot, ReservationError> {
        self.check_id(mid)?;
        let holder = normalize_holder(holder)?;

        if !self.list_reservations().await?.contains_key(mid) {
            return Err(ReservationError::NotFound {
                mid: mid.to_string(),
            });
        }

        self.cache.invalidate().await;
        let affected = self
            .store
            .update(
                ELEMENTS_TABLE,
                &HolderUpdate { name: holder },
                &ElementKey::new(mid),
            )
            .await?;
        if affected == 0 {
            return Err(ReservationError::NotFound {
                mid: mid.to_string(),
            });
        }

        info!(mid, "Reservation modified");
        self.list_reservations().await
    }

    /// Release an element. Releasing an unreserved element is not an error.
    #[instrument(skip(self, caller), fields(uid = caller.uid))]
    pub async fn release(
        &self,
        mid: &str,
        caller: &Identity,
    ) -> Result<Snapshot, ReservationError> {
        self.check_id(mid)?;

        self.cache.invalidate().await;
        let affected = self
            .store
            .delete(ELEMENTS_TABLE, &ElementKey::new(mid))
            .await?;

        info!(mid, released = affected > 0, "Reservation released");
        self.list_reservations().await
    }

    /// Evict expired cache entries.
    pub async fn purge_cache(&self) {
        self.cache.purge().await;
    }

    fn check_id(&self, mid: &str) -> Result<(), ReservationError> {
        if self.catalog.is_valid(mid) {
            Ok(())
        } else {
            Err(ReservationError::InvalidElementId(mid.to_string()))
        }
    }
}

/// Trim a holder name; blank means anonymous.
fn normalize_holder(holder: Option<&str>) -> Result<Option<String>, ReservationError> {
    let Some(name) = holder.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > MAX_HOLDER_CHARS {
        return Err(ReservationError::InvalidHolderName);
    }
    Ok(Some(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holder_is_trimmed() {
        assert_eq!(
            normalize_holder(Some("  Bob ")).ok().flatten().as_deref(),
            Some("Bob")
        );
        assert_eq!(normalize_holder(Some("   ")).ok().flatten(), None);
        assert_eq!(normalize_holder(None).ok().flatten(), None);
    }

    #[test]
    fn overlong_holder_is_rejected() {
        let name = "x".repeat(MAX_HOLDER_CHARS + 1);
        assert!(matches!(
            normalize_holder(Some(&name)),
            Err(ReservationError::InvalidHolderName)
        ));
        assert!(normalize_holder(Some(&"x".repeat(MAX_HOLDER_CHARS))).is_ok());
    }
}
