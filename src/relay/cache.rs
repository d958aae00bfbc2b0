//! Read-through LRU cache of communications.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::observability::metrics;
use crate::services::types::Communication;

/// Bounded LRU map from communication id to communication.
///
/// All access goes through one lock, so a lookup of several ids sees a
/// single consistent snapshot and LRU order never tears.
pub struct CommunicationCache {
    entries: Mutex<LruCache<String, Communication>>,
}

impl CommunicationCache {
    /// `None` when `capacity` is 0, which disables caching.
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// All of `ids`, in order, if every one is cached; otherwise `None`.
    ///
    /// Hits are only promoted in LRU order when the whole set is present.
    pub fn get_all(&self, ids: &[&str]) -> Option<Vec<Communication>> {
        let mut entries = self.entries.lock();
        let complete = ids.iter().all(|id| entries.contains(*id));
        metrics::record_cache_lookup(complete);
        if !complete {
            return None;
        }
        ids.iter().map(|id| entries.get(*id).cloned()).collect()
    }

    /// Cache communications under their ids. Entries without an id are skipped.
    pub fn insert_all(&self, communications: &[Communication]) {
        let mut entries = self.entries.lock();
        for comm in communications {
            if let Some(id) = comm.id() {
                tracing::debug!(communication_id = id, "Caching communication");
                entries.put(id.to_string(), comm.clone());
            }
        }
        metrics::set_cache_entries(entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::types::fixtures::communication;

    #[test]
    fn zero_capacity_disables() {
        assert!(CommunicationCache::new(0).is_none());
        assert_eq!(CommunicationCache::new(3).unwrap().capacity(), 3);
    }

    #[test]
    fn partial_hit_is_a_miss() {
        let cache = CommunicationCache::new(4).unwrap();
        cache.insert_all(&[communication("a", "", &[])]);
        assert!(cache.get_all(&["a", "b"]).is_none());
        let hit = cache.get_all(&["a", "a"]).unwrap();
        assert_eq!(hit.len(), 2);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = CommunicationCache::new(2).unwrap();
        cache.insert_all(&[communication("a", "", &[])]);
        cache.insert_all(&[communication("b", "", &[])]);
        assert!(cache.get_all(&["a"]).is_some());
        cache.insert_all(&[communication("c", "", &[])]);
        assert!(cache.get_all(&["b"]).is_none());
        assert!(cache.get_all(&["a", "c"]).is_some());
        assert_eq!(cache.len(), 2);
    }
}
