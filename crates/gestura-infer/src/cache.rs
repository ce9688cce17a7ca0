//! Process-wide cache of loaded user models.
//!
//! Each user has its own slot lock. Loads happen while holding the slot, and
//! `invalidate` takes the same lock, so a load that read the previous blob can
//! never land after the invalidation that follows a save. Absent models and
//! load errors are not cached. There is no eviction besides `invalidate` and
//! `clear`, so memory grows with the number of distinct users seen.

use std::sync::Arc;

use dashmap::DashMap;
use gestura_core::Result;
use parking_lot::Mutex;
use tracing::debug;

use crate::model_store::UserModel;

type Slot = Arc<Mutex<Option<Arc<UserModel>>>>;

#[derive(Default)]
pub struct ModelCache {
    slots: DashMap<String, Slot>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: &str) -> Slot {
        // Clone the slot out so the map shard is not held while loading.
        self.slots
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// Cached model for `user_id`, or the result of `loader` on a miss.
    pub fn get_or_load<F>(&self, user_id: &str, loader: F) -> Result<Option<Arc<UserModel>>>
    where
        F: FnOnce() -> Result<Option<UserModel>>,
    {
        let slot = self.slot(user_id);
        let mut guard = slot.lock();
        if let Some(model) = guard.as_ref() {
            return Ok(Some(model.clone()));
        }

        let loaded = loader()?.map(Arc::new);
        if loaded.is_some() {
            debug!("Loaded model for {} into cache", user_id);
        }
        *guard = loaded.clone();
        Ok(loaded)
    }

    /// Cached model without loading.
    pub fn get(&self, user_id: &str) -> Option<Arc<UserModel>> {
        let slot = self.slots.get(user_id)?.clone();
        let guard = slot.lock();
        guard.clone()
    }

    /// Drop the cached model so the next lookup reloads from the store.
    pub fn invalidate(&self, user_id: &str) {
        let Some(slot) = self.slots.get(user_id).map(|s| s.clone()) else {
            return;
        };
        *slot.lock() = None;
        debug!("Invalidated cached model for {}", user_id);
    }

    /// Number of users with a loaded model.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}
