//! Per-container item snapshots for the current session.
//!
//! A key being present means that container has been observed at least once
//! since login; an observed-but-empty container is an empty map, which is a
//! different state from "never seen". Entries are only ever replaced
//! wholesale, never patched.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    caches: BTreeMap<i32, BTreeMap<i32, u64>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot for `canonical_id` and marks it observed.
    /// Empty-slot entries (`item_id <= 0`) are dropped, negative quantities
    /// clamp to zero, and repeated stacks of one item sum.
    pub fn replace(&mut self, canonical_id: i32, items: &[(i32, i64)]) {
        let mut mapping = BTreeMap::new();
        for &(item_id, quantity) in items {
            if item_id <= 0 {
                continue;
            }
            let clamped = quantity.max(0) as u64;
            *mapping.entry(item_id).or_insert(0) += clamped;
        }
        self.caches.insert(canonical_id, mapping);
    }

    /// `None` strictly means "not observed this session".
    pub fn get(&self, canonical_id: i32) -> Option<&BTreeMap<i32, u64>> {
        self.caches.get(&canonical_id)
    }

    /// `None` when the container is unobserved; `Some(0)` when observed but
    /// the item is absent from it.
    pub fn quantity_of(&self, canonical_id: i32, item_id: i32) -> Option<u64> {
        self.caches
            .get(&canonical_id)
            .map(|mapping| mapping.get(&item_id).copied().unwrap_or(0))
    }

    pub fn observed(&self, canonical_id: i32) -> bool {
        self.caches.contains_key(&canonical_id)
    }

    pub fn observed_count(&self) -> usize {
        self.caches.len()
    }

    /// Session end: all observations are forgotten.
    pub fn clear(&mut self) {
        self.caches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_sums_duplicate_stacks_and_skips_empty_slots() {
        let mut cache = SnapshotCache::new();
        cache.replace(95, &[(42, 100), (-1, 50), (0, 7), (42, 25), (7, 1)]);

        let mapping = cache.get(95).expect("observed");
        assert_eq!(mapping.get(&42), Some(&125));
        assert_eq!(mapping.get(&7), Some(&1));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn negative_quantities_clamp_to_zero() {
        let mut cache = SnapshotCache::new();
        cache.replace(95, &[(42, -5), (42, 10)]);
        assert_eq!(cache.quantity_of(95, 42), Some(10));
    }

    #[test]
    fn observed_empty_differs_from_unobserved() {
        let mut cache = SnapshotCache::new();
        assert!(!cache.observed(516));
        assert_eq!(cache.quantity_of(516, 42), None);

        cache.replace(516, &[]);
        assert!(cache.observed(516));
        assert_eq!(cache.quantity_of(516, 42), Some(0));
    }

    #[test]
    fn replace_is_wholesale_not_incremental() {
        let mut cache = SnapshotCache::new();
        cache.replace(95, &[(42, 100), (7, 3)]);
        cache.replace(95, &[(42, 60)]);

        assert_eq!(cache.quantity_of(95, 42), Some(60));
        assert_eq!(cache.quantity_of(95, 7), Some(0));
    }

    #[test]
    fn clear_forgets_all_observations() {
        let mut cache = SnapshotCache::new();
        cache.replace(95, &[(42, 100)]);
        cache.clear();
        assert!(!cache.observed(95));
        assert_eq!(cache.observed_count(), 0);
    }
}
