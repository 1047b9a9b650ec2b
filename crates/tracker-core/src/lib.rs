//! Container aggregation core: registry, snapshot cache, category order,
//! debounced change notification, and the single-writer tracker engine.

pub mod cache;
pub mod category;
pub mod notifier;
pub mod registry;
pub mod tracker;

pub use cache::SnapshotCache;
pub use category::{CategoryError, CategoryOrder};
pub use notifier::{FlushScheduler, FlushSignal};
pub use registry::{ContainerRegistry, RegistryError};
pub use tracker::TrackerEngine;
