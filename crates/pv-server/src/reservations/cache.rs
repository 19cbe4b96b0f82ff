//! Read-through cache of the reservation inventory.
//!
//! The whole `mid -> holder` map is cached as a single value under one key.
//! It is either absent or a complete snapshot, and any mutation drops it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

/// Complete reservation state: element id to optional holder name.
pub type Snapshot = Arc<BTreeMap<String, Option<String>>>;

const INVENTORY_KEY: &str = "elements";

#[derive(Clone)]
pub struct InventoryCache {
    entries: Cache<&'static str, Snapshot>,
}

impl InventoryCache {
    /// Cache whose snapshot expires `ttl` after it was stored.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// The cached snapshot, unless absent or expired.
    pub async fn get(&self) -> Option<Snapshot> {
        self.entries.get(INVENTORY_KEY).await
    }

    pub async fn store(&self, snapshot: Snapshot) {
        self.entries.insert(INVENTORY_KEY, snapshot).await;
    }

    /// Drop the snapshot; the next read rebuilds it from the store.
    pub async fn invalidate(&self) {
        self.entries.invalidate(INVENTORY_KEY).await;
    }

    /// Evict expired entries now instead of on the next access.
    pub async fn purge(&self) {
        self.entries.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}
