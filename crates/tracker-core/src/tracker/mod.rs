//! The single-writer tracker engine.
//!
//! All mutation happens on the data-source thread that delivers container
//! snapshots. Other threads interact by enqueueing [`Command`]s, which are
//! drained here in arrival order before each pass. The engine keeps a
//! monotonic tick counter that drives the debounced flush scheduler; it
//! never calls back into the event source.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

mod commands;
mod reconcile;


use contracts::{Command, CommandPayload, ItemKey, TrackedItem, TrackerConfig};
use log::debug;

use crate::cache::SnapshotCache;
use crate::category::CategoryOrder;
use crate::notifier::{FlushScheduler, FlushSignal};
use crate::registry::ContainerRegistry;

#[derive(Debug, Clone)]
struct QueuedCommand {
    insertion_sequence: u64,
    command: Command,
}

#[derive(Debug)]
pub struct TrackerEngine {
    config: TrackerConfig,
    registry: ContainerRegistry,
    cache: SnapshotCache,
    items: BTreeMap<ItemKey, TrackedItem>,
    category_order: CategoryOrder,
    queued_commands: VecDeque<QueuedCommand>,
    next_command_sequence: u64,
    scheduler: FlushScheduler,
    clock: u64,
}

impl TrackerEngine {
    pub fn new(config: TrackerConfig, registry: ContainerRegistry) -> Self {
        let scheduler = FlushScheduler::new(config.debounce_ticks);
        Self {
            config,
            registry,
            cache: SnapshotCache::new(),
            items: BTreeMap::new(),
            category_order: CategoryOrder::new(),
            queued_commands: VecDeque::new(),
            next_command_sequence: 0,
            scheduler,
            clock: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Enablement toggles take effect on the next reconciliation pass.
    pub fn config_mut(&mut self) -> &mut TrackerConfig {
        &mut self.config
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn items(&self) -> &BTreeMap<ItemKey, TrackedItem> {
        &self.items
    }

    pub fn item(&self, key: &ItemKey) -> Option<&TrackedItem> {
        self.items.get(key)
    }

    pub fn category_order(&self) -> &CategoryOrder {
        &self.category_order
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn queue_depth(&self) -> usize {
        self.queued_commands.len()
    }

    pub fn has_pending_flush(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Queues a request from another thread; applied on the next pump in
    /// FIFO order.
    pub fn enqueue_command(&mut self, command: Command) {
        self.queued_commands.push_back(QueuedCommand {
            insertion_sequence: self.next_command_sequence,
            command,
        });
        self.next_command_sequence = self.next_command_sequence.saturating_add(1);
    }

    /// Entry point for the host's container-change event. Returns `true`
    /// when the snapshot was accepted (registered, enabled container).
    pub fn observe_container(&mut self, raw_container_id: i32, items: &[(i32, i64)]) -> bool {
        self.clock = self.clock.saturating_add(1);
        self.process_queued_commands();

        let canonical_id = self.registry.normalize(raw_container_id);
        let Some(container) = self.registry.get(canonical_id) else {
            return false;
        };
        if !self.config.is_enabled(&container.config_key) {
            return false;
        }

        self.cache.replace(canonical_id, items);
        let changed = self.reconcile_all();
        if !changed.is_empty() {
            debug!(
                "container {} updated, {} tracked item(s) changed",
                canonical_id,
                changed.len()
            );
            self.scheduler.schedule(changed, self.clock);
        }
        true
    }

    /// Host idle pump: drains queued commands and returns the coalesced
    /// flush signal once the debounce window has elapsed.
    pub fn on_idle(&mut self) -> Option<FlushSignal> {
        self.clock = self.clock.saturating_add(1);
        self.process_queued_commands();
        self.scheduler.poll(self.clock)
    }

    /// Walks every tracked item against the current caches. Public so hosts
    /// can force a pass after config toggles; read-only on the cache.
    pub fn reconcile_all(&mut self) -> BTreeSet<ItemKey> {
        let mut changed = BTreeSet::new();
        for (key, item) in &mut self.items {
            let Some((total, breakdown)) = reconcile::reconcile_breakdown(
                &self.registry,
                &self.config,
                &self.cache,
                item.item_id,
                &item.container_quantities,
            ) else {
                // Nothing observed yet this session; leave saved state alone.
                continue;
            };

            if item.current_amount != total || item.container_quantities != breakdown {
                item.current_amount = total;
                item.container_quantities = breakdown;
                changed.insert(key.clone());
            }
        }
        changed
    }

    /// Logout: observations are ephemeral, tracking intents are not.
    pub fn end_session(&mut self) {
        self.cache.clear();
    }

    /// Installs persisted state. Callers repair blobs first (see the API
    /// facade); categories reachable only through items are appended here so
    /// the order list never lags the item data.
    pub fn load_state(&mut self, items: Vec<TrackedItem>, category_order: Vec<String>) {
        self.items.clear();
        self.category_order = CategoryOrder::load(category_order);
        for item in items {
            self.category_order.register(&item.category);
            self.items.insert(item.key(), item);
        }
    }
}
