//! Constructed-once catalog of containers with alias normalization.
//!
//! The registry is a value handed to the engine, not process-wide state, so
//! tests can build small isolated catalogs. Alternate raw identities are
//! expressed as alias ranges resolved by [`ContainerRegistry::normalize`];
//! they are never registered as distinct entries.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use contracts::Container;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateContainer(i32),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateContainer(id) => {
                write!(f, "container id {id} is already registered")
            }
        }
    }
}

impl Error for RegistryError {}

/// Maps a contiguous block of alternate raw ids onto a contiguous block of
/// canonical ids, e.g. boat alternates 33731..=33735 onto 963..=967.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AliasRange {
    raw_start: i32,
    raw_end: i32,
    canonical_start: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerRegistry {
    containers: BTreeMap<i32, Container>,
    insertion_order: Vec<i32>,
    aliases: Vec<AliasRange>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The production catalog, mirroring the host's container set.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let catalog = [
            Container::new(95, "Bank", "trackBank"),
            Container::new(93, "Inventory", "trackInventory"),
            Container::new(626, "Seed Vault", "trackSeedVault"),
            Container::new(525, "Gravestone", "trackGravestone"),
            Container::new(659, "Group storage", "trackGroupStorage"),
            Container::new(516, "Looting Bag", "trackLootingBag"),
            // Synthetic id: potion storage has no host container of its own.
            Container::new(-420, "Potion Storage", "trackPotionStorage"),
            Container::new(963, "Boat 1", "trackBoatInventory"),
            Container::new(964, "Boat 2", "trackBoatInventory"),
            Container::new(965, "Boat 3", "trackBoatInventory"),
            Container::new(966, "Boat 4", "trackBoatInventory"),
            Container::new(967, "Boat 5", "trackBoatInventory"),
        ];
        for container in catalog {
            registry
                .register(container)
                .expect("standard catalog has unique ids");
        }
        registry.register_alias_range(33731, 33735, 963);
        registry
    }

    pub fn register(&mut self, container: Container) -> Result<(), RegistryError> {
        let id = container.container_id;
        if self.containers.contains_key(&id) {
            return Err(RegistryError::DuplicateContainer(id));
        }
        self.containers.insert(id, container);
        self.insertion_order.push(id);
        Ok(())
    }

    /// Declares `raw_start..=raw_end` as alternates of the canonical block
    /// starting at `canonical_start`, offset-for-offset.
    pub fn register_alias_range(&mut self, raw_start: i32, raw_end: i32, canonical_start: i32) {
        self.aliases.push(AliasRange {
            raw_start,
            raw_end,
            canonical_start,
        });
    }

    /// Resolves a raw container id to its canonical id. Identity for ids with
    /// no alias rule.
    pub fn normalize(&self, raw_id: i32) -> i32 {
        for alias in &self.aliases {
            if raw_id >= alias.raw_start && raw_id <= alias.raw_end {
                return alias.canonical_start + (raw_id - alias.raw_start);
            }
        }
        raw_id
    }

    pub fn get(&self, canonical_id: i32) -> Option<&Container> {
        self.containers.get(&canonical_id)
    }

    pub fn by_config_key(&self, config_key: &str) -> Option<&Container> {
        self.iter()
            .find(|container| container.config_key == config_key)
    }

    pub fn is_registered(&self, canonical_id: i32) -> bool {
        self.containers.contains_key(&canonical_id)
    }

    pub fn display_name_of(&self, raw_id: i32) -> &str {
        self.get(self.normalize(raw_id))
            .map(|container| container.display_name.as_str())
            .unwrap_or("Unknown")
    }

    /// Containers in registration order; stable for deterministic passes.
    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.containers.get(id))
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
