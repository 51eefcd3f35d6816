//! Optional snapshot cache for collection lists.
//!
//! The cache is an explicit object handed to repositories; nothing caches
//! implicitly. A mutation through a repository invalidates the whole
//! collection, so the next list refetches from the store.

use crate::model::{Collection, Fields};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<Collection, Vec<Fields>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: Collection) -> Option<Vec<Fields>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&collection).cloned())
    }

    pub fn put(&self, collection: Collection, records: Vec<Fields>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(collection, records);
        }
    }

    pub fn invalidate(&self, collection: Collection) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&collection);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
