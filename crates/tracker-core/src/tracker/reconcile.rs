//! The per-item aggregation walk.
//!
//! For one item: visit every enabled container in registry order, dedup
//! aliases by canonical id, sum fresh cache values, and carry forward the
//! previously saved breakdown for containers not yet observed this session.
//! Returns `None` when no container has fresh data, in which case the caller
//! must not touch the item at all.

use std::collections::{BTreeMap, BTreeSet};

use contracts::TrackerConfig;

use crate::cache::SnapshotCache;
use crate::registry::ContainerRegistry;

pub(super) fn reconcile_breakdown(
    registry: &ContainerRegistry,
    config: &TrackerConfig,
    cache: &SnapshotCache,
    item_id: i32,
    prior: &BTreeMap<String, u64>,
) -> Option<(u64, BTreeMap<String, u64>)> {
    let mut total = 0_u64;
    let mut breakdown = BTreeMap::new();
    let mut any_fresh_data = false;
    let mut seen_canonical = BTreeSet::new();

    for container in registry.iter() {
        if !config.is_enabled(&container.config_key) {
            continue;
        }

        let canonical_id = registry.normalize(container.container_id);
        if !seen_canonical.insert(canonical_id) {
            // Alias of a container already counted under its canonical form.
            continue;
        }

        match cache.quantity_of(canonical_id, item_id) {
            Some(quantity) => {
                breakdown.insert(container.display_name.clone(), quantity);
                total = total.saturating_add(quantity);
                any_fresh_data = true;
            }
            None => {
                if let Some(saved) = prior.get(&container.display_name) {
                    breakdown.insert(container.display_name.clone(), *saved);
                    total = total.saturating_add(*saved);
                }
            }
        }
    }

    any_fresh_data.then_some((total, breakdown))
}
