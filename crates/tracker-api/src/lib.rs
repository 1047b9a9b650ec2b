//! Host-facing facade over the tracker engine: command validation, the
//! event pump, and profile-backed persistence of tracked state.

pub mod persistence;

use std::path::Path;

use contracts::{
    ApiError, Command, CommandPayload, CommandResult, CommandType, ErrorCode, ItemKey,
    TrackedItem, TrackerConfig, SCHEMA_VERSION_V1,
};
use log::{debug, error, warn};
use tracker_core::{ContainerRegistry, FlushSignal, TrackerEngine};

pub use persistence::{ConfigStore, MemoryConfigStore, PersistenceError, SqliteProfileStore};

const KEY_TRACKED_ITEMS: &str = "trackedItems";
const KEY_CATEGORY_ORDER: &str = "categoryOrder";

pub struct TrackerApi {
    engine: TrackerEngine,
    store: Option<Box<dyn ConfigStore>>,
    command_audit: Vec<CommandResult>,
    last_persistence_error: Option<String>,
}

impl TrackerApi {
    pub fn new(config: TrackerConfig, registry: ContainerRegistry) -> Self {
        Self {
            engine: TrackerEngine::new(config, registry),
            store: None,
            command_audit: Vec::new(),
            last_persistence_error: None,
        }
    }

    /// Facade over the built-in container catalog.
    pub fn with_standard_registry(config: TrackerConfig) -> Self {
        Self::new(config, ContainerRegistry::standard())
    }

    pub fn attach_store(&mut self, store: Box<dyn ConfigStore>) {
        self.store = Some(store);
    }

    pub fn attach_sqlite_store(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let store = SqliteProfileStore::open(path)?;
        self.store = Some(Box::new(store));
        Ok(())
    }

    /// Restore tracked items and category order from the attached store.
    /// Individually malformed entries are skipped and logged; a blob that
    /// cannot be parsed at all falls back to a cold start so one corrupt
    /// profile never wedges the host.
    pub fn load(&mut self) -> Result<(), PersistenceError> {
        let store = self.store.as_ref().ok_or(PersistenceError::NotAttached)?;
        let group = self.engine.config().config_group.clone();
        let default_category = self.engine.config().default_category.clone();

        let items = match store.get(&group, KEY_TRACKED_ITEMS)? {
            Some(raw) if !raw.is_empty() => parse_tracked_items(&raw, &default_category),
            _ => Vec::new(),
        };

        let category_order = match store.get(&group, KEY_CATEGORY_ORDER)? {
            Some(raw) if !raw.is_empty() => parse_category_order(&raw),
            _ => Vec::new(),
        };

        debug!(
            "loaded profile state: {} items, {} categories",
            items.len(),
            category_order.len()
        );
        self.engine.load_state(items, category_order);
        Ok(())
    }

    /// Write the current tracked state back to the attached store. An empty
    /// item list clears the key rather than storing an empty array, matching
    /// what `load` treats as a cold start.
    pub fn save(&mut self) -> Result<(), PersistenceError> {
        let items: Vec<&TrackedItem> = self.engine.items().values().collect();
        let order = self.engine.category_order().as_slice().to_vec();
        let group = self.engine.config().config_group.clone();

        let items_json = serde_json::to_string(&items)?;
        let order_json = serde_json::to_string(&order)?;

        let store = self.store.as_mut().ok_or(PersistenceError::NotAttached)?;
        if items.is_empty() {
            store.unset(&group, KEY_TRACKED_ITEMS)?;
        } else {
            store.set(&group, KEY_TRACKED_ITEMS, &items_json)?;
        }
        if order.is_empty() {
            store.unset(&group, KEY_CATEGORY_ORDER)?;
        } else {
            store.set(&group, KEY_CATEGORY_ORDER, &order_json)?;
        }
        Ok(())
    }

    /// Validate and queue a mutation. Rejected commands never reach the
    /// engine; every outcome lands in the audit trail.
    pub fn submit_command(&mut self, command: Command) -> CommandResult {
        let result = match self.validate_command(&command) {
            Some(error) => CommandResult::rejected(&command, error),
            None => {
                self.engine.enqueue_command(command.clone());
                CommandResult::accepted(&command)
            }
        };

        self.command_audit.push(result.clone());
        result
    }

    /// Forward a container snapshot from the host event source.
    pub fn on_container_observed(&mut self, raw_container_id: i32, items: &[(i32, i64)]) -> bool {
        self.engine.observe_container(raw_container_id, items)
    }

    /// Advance the pump one tick. When the debounce window closes this
    /// persists the new state and hands the coalesced change set back to the
    /// host for display refresh.
    pub fn on_idle(&mut self) -> Option<FlushSignal> {
        let signal = self.engine.on_idle()?;
        self.save_if_attached();
        Some(signal)
    }

    /// Persist and drop per-session observations. Totals and breakdowns
    /// survive; the next session starts with nothing observed.
    pub fn end_session(&mut self) {
        self.save_if_attached();
        self.engine.end_session();
    }

    pub fn engine(&self) -> &TrackerEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TrackerEngine {
        &mut self.engine
    }

    pub fn command_audit(&self) -> &[CommandResult] {
        &self.command_audit
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    fn save_if_attached(&mut self) {
        if self.store.is_none() {
            return;
        }

        if let Err(err) = self.save() {
            error!("failed to persist tracker state: {err}");
            self.last_persistence_error = Some(err.to_string());
        }
    }

    fn validate_command(&self, command: &Command) -> Option<ApiError> {
        if command.schema_version != SCHEMA_VERSION_V1 {
            return Some(ApiError::new(
                ErrorCode::ContractVersionUnsupported,
                "Unsupported schema_version",
                Some(format!(
                    "got={} expected={}",
                    command.schema_version, SCHEMA_VERSION_V1
                )),
            ));
        }

        if !command_type_matches_payload(command.command_type, &command.payload) {
            return Some(ApiError::new(
                ErrorCode::InvalidCommand,
                "command_type does not match payload variant",
                None,
            ));
        }

        let order = self.engine.category_order();
        match &command.payload {
            CommandPayload::AddItem {
                item_id, item_name, ..
            } => {
                if *item_id <= 0 {
                    return Some(ApiError::new(
                        ErrorCode::InvalidCommand,
                        "item_id must be positive",
                        Some(format!("item_id={item_id}")),
                    ));
                }
                if item_name.trim().is_empty() {
                    return Some(ApiError::new(
                        ErrorCode::InvalidCommand,
                        "item_name must not be empty",
                        None,
                    ));
                }
            }
            CommandPayload::RemoveItem { item_id, category }
            | CommandPayload::SetGoal {
                item_id, category, ..
            } => {
                let key = ItemKey::new(*item_id, category.as_str());
                if self.engine.item(&key).is_none() {
                    return Some(ApiError::new(
                        ErrorCode::ItemNotFound,
                        "no tracked item under that key",
                        Some(key.to_string()),
                    ));
                }
            }
            CommandPayload::RegisterCategory { name } => {
                if name.trim().is_empty() {
                    return Some(ApiError::new(
                        ErrorCode::InvalidCommand,
                        "category name must not be empty",
                        None,
                    ));
                }
            }
            CommandPayload::RemoveCategory { name } | CommandPayload::MoveCategory { name, .. } => {
                if !order.contains(name) {
                    return Some(ApiError::new(
                        ErrorCode::CategoryNotFound,
                        "no such category",
                        Some(name.clone()),
                    ));
                }
            }
            CommandPayload::RenameCategory { old_name, new_name } => {
                if !order.contains(old_name) {
                    return Some(ApiError::new(
                        ErrorCode::CategoryNotFound,
                        "no such category",
                        Some(old_name.clone()),
                    ));
                }
                if new_name.trim().is_empty() {
                    return Some(ApiError::new(
                        ErrorCode::InvalidCommand,
                        "category name must not be empty",
                        None,
                    ));
                }
                let collides = order.as_slice().iter().any(|existing| {
                    !existing.eq(old_name) && existing.eq_ignore_ascii_case(new_name)
                });
                if collides {
                    return Some(ApiError::new(
                        ErrorCode::DuplicateCategoryName,
                        "a category with that name already exists",
                        Some(new_name.clone()),
                    ));
                }
            }
            CommandPayload::ResetAll => {}
        }

        None
    }
}

fn command_type_matches_payload(command_type: CommandType, payload: &CommandPayload) -> bool {
    matches!(
        (command_type, payload),
        (CommandType::AddItem, CommandPayload::AddItem { .. })
            | (CommandType::RemoveItem, CommandPayload::RemoveItem { .. })
            | (CommandType::SetGoal, CommandPayload::SetGoal { .. })
            | (
                CommandType::RegisterCategory,
                CommandPayload::RegisterCategory { .. }
            )
            | (
                CommandType::RemoveCategory,
                CommandPayload::RemoveCategory { .. }
            )
            | (
                CommandType::RenameCategory,
                CommandPayload::RenameCategory { .. }
            )
            | (
                CommandType::MoveCategory,
                CommandPayload::MoveCategory { .. }
            )
            | (CommandType::ResetAll, CommandPayload::ResetAll)
    )
}

/// Lenient decode of the tracked-items blob. The outer array is parsed as
/// raw values first so one malformed entry is dropped instead of discarding
/// the whole profile.
fn parse_tracked_items(raw: &str, default_category: &str) -> Vec<TrackedItem> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(err) => {
            error!("tracked items blob is unreadable, starting cold: {err}");
            return Vec::new();
        }
    };

    let mut items = Vec::new();
    for value in values {
        match serde_json::from_value::<TrackedItem>(value) {
            Ok(mut item) => {
                if item.item_id <= 0 {
                    warn!("dropping stored item with invalid id {}", item.item_id);
                    continue;
                }
                if item.category.is_empty() {
                    item.category = default_category.to_string();
                }
                items.push(item);
            }
            Err(err) => {
                warn!("dropping malformed stored item: {err}");
            }
        }
    }
    items
}

fn parse_category_order(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(order) => order,
        Err(err) => {
            error!("category order blob is unreadable, starting cold: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Container, DEFAULT_CATEGORY};

    fn test_registry() -> ContainerRegistry {
        let mut registry = ContainerRegistry::new();
        registry
            .register(Container::new(1, "Bank", "trackBank"))
            .expect("register bank");
        registry
            .register(Container::new(2, "Inventory", "trackInventory"))
            .expect("register inventory");
        registry
    }

    fn test_api() -> TrackerApi {
        let config = TrackerConfig {
            debounce_ticks: 0,
            ..TrackerConfig::default()
        };
        TrackerApi::new(config, test_registry())
    }

    fn add_item_command(item_id: i32, item_name: &str) -> Command {
        Command::new(
            format!("cmd_add_{item_id}"),
            CommandType::AddItem,
            CommandPayload::AddItem {
                item_id,
                item_name: item_name.to_string(),
                goal_amount: None,
                category: String::new(),
            },
        )
    }

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();

        std::env::temp_dir().join(format!("resource_tracker_{name}_{nanos}.sqlite"))
    }

    #[test]
    fn add_item_flows_through_the_pump() {
        let mut api = test_api();
        let result = api.submit_command(add_item_command(42, "Yew logs"));
        assert!(result.accepted);

        api.on_idle();
        api.on_container_observed(1, &[(42, 600)]);

        let item = api
            .engine()
            .item(&ItemKey::new(42, DEFAULT_CATEGORY))
            .expect("tracked");
        assert_eq!(item.current_amount, 600);
    }

    #[test]
    fn rejects_mismatched_payload_type() {
        let mut api = test_api();
        let bad = Command::new(
            "cmd_bad",
            CommandType::RemoveItem,
            CommandPayload::ResetAll,
        );

        let result = api.submit_command(bad);
        assert!(!result.accepted);
        assert_eq!(
            result.error.map(|error| error.error_code),
            Some(ErrorCode::InvalidCommand)
        );
        assert_eq!(api.engine().queue_depth(), 0);
        assert_eq!(api.command_audit().len(), 1);
    }

    #[test]
    fn rejects_invalid_item_id_and_empty_name() {
        let mut api = test_api();
        assert!(!api.submit_command(add_item_command(0, "Coins")).accepted);
        assert!(!api.submit_command(add_item_command(-1, "Coins")).accepted);
        assert!(!api.submit_command(add_item_command(42, "  ")).accepted);
        assert_eq!(api.engine().queue_depth(), 0);
    }

    #[test]
    fn rejects_goal_for_untracked_item() {
        let mut api = test_api();
        let result = api.submit_command(Command::new(
            "cmd_goal",
            CommandType::SetGoal,
            CommandPayload::SetGoal {
                item_id: 42,
                category: DEFAULT_CATEGORY.to_string(),
                goal_amount: Some(100),
            },
        ));

        assert!(!result.accepted);
        assert_eq!(
            result.error.map(|error| error.error_code),
            Some(ErrorCode::ItemNotFound)
        );
    }

    #[test]
    fn rejects_rename_collision_and_missing_source() {
        let mut api = test_api();
        api.submit_command(add_item_command(42, "Yew logs"));
        api.submit_command(Command::new(
            "cmd_cat",
            CommandType::RegisterCategory,
            CommandPayload::RegisterCategory {
                name: "Ores".to_string(),
            },
        ));
        api.on_idle();

        let missing = api.submit_command(Command::new(
            "cmd_rename_missing",
            CommandType::RenameCategory,
            CommandPayload::RenameCategory {
                old_name: "Nope".to_string(),
                new_name: "Metals".to_string(),
            },
        ));
        assert_eq!(
            missing.error.map(|error| error.error_code),
            Some(ErrorCode::CategoryNotFound)
        );

        let collision = api.submit_command(Command::new(
            "cmd_rename_collision",
            CommandType::RenameCategory,
            CommandPayload::RenameCategory {
                old_name: "Ores".to_string(),
                new_name: "default".to_string(),
            },
        ));
        assert_eq!(
            collision.error.map(|error| error.error_code),
            Some(ErrorCode::DuplicateCategoryName)
        );
    }

    #[test]
    fn state_round_trips_through_memory_store() {
        let mut api = test_api();
        api.attach_store(Box::new(MemoryConfigStore::new()));
        api.submit_command(add_item_command(42, "Yew logs"));
        api.on_idle();
        api.on_container_observed(1, &[(42, 600)]);
        assert!(api.on_idle().is_some(), "flush should persist");

        let mut api = {
            let mut fresh = test_api();
            let mut store = MemoryConfigStore::new();
            // Re-read what the first instance saved.
            let group = api.engine().config().config_group.clone();
            for key in [KEY_TRACKED_ITEMS, KEY_CATEGORY_ORDER] {
                if let Some(value) = api
                    .store
                    .as_ref()
                    .expect("store attached")
                    .get(&group, key)
                    .expect("memory get")
                {
                    store.set(&group, key, &value).expect("memory set");
                }
            }
            fresh.attach_store(Box::new(store));
            fresh
        };
        api.load().expect("load");

        let item = api
            .engine()
            .item(&ItemKey::new(42, DEFAULT_CATEGORY))
            .expect("restored");
        assert_eq!(item.current_amount, 600);
        assert_eq!(item.container_quantities.get("Bank"), Some(&600));
        assert!(api.engine().category_order().contains(DEFAULT_CATEGORY));
    }

    #[test]
    fn state_round_trips_through_sqlite_store() {
        let db_path = temp_db_path("round_trip");

        let mut api = test_api();
        api.attach_sqlite_store(&db_path).expect("open store");
        api.submit_command(add_item_command(42, "Yew logs"));
        api.on_idle();
        api.on_container_observed(1, &[(42, 600)]);
        api.on_idle();
        api.end_session();
        drop(api);

        let mut api = test_api();
        api.attach_sqlite_store(&db_path).expect("reopen store");
        api.load().expect("load");

        let item = api
            .engine()
            .item(&ItemKey::new(42, DEFAULT_CATEGORY))
            .expect("restored");
        assert_eq!(item.current_amount, 600);
        assert!(api.last_persistence_error().is_none());

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn load_skips_malformed_entries_and_repairs_categories() {
        let mut api = test_api();
        let group = api.engine().config().config_group.clone();

        let mut store = MemoryConfigStore::new();
        store
            .set(
                &group,
                KEY_TRACKED_ITEMS,
                r#"[
                    {"item_id": 42, "item_name": "Yew logs", "goal_amount": null, "category": ""},
                    {"item_name": "missing id"},
                    {"item_id": -5, "item_name": "bad id", "goal_amount": null},
                    "not even an object"
                ]"#,
            )
            .expect("memory set");
        api.attach_store(Box::new(store));
        api.load().expect("load");

        assert_eq!(api.engine().items().len(), 1);
        let item = api
            .engine()
            .item(&ItemKey::new(42, DEFAULT_CATEGORY))
            .expect("repaired");
        assert_eq!(item.category, DEFAULT_CATEGORY);
        assert!(api.engine().category_order().contains(DEFAULT_CATEGORY));
    }

    #[test]
    fn unreadable_blob_falls_back_to_cold_start() {
        let mut api = test_api();
        let group = api.engine().config().config_group.clone();

        let mut store = MemoryConfigStore::new();
        store
            .set(&group, KEY_TRACKED_ITEMS, "{definitely not json")
            .expect("memory set");
        store
            .set(&group, KEY_CATEGORY_ORDER, "also broken")
            .expect("memory set");
        api.attach_store(Box::new(store));

        api.load().expect("load succeeds despite corrupt blobs");
        assert!(api.engine().items().is_empty());
        assert!(api.engine().category_order().is_empty());
    }

    #[test]
    fn empty_state_clears_stored_keys() {
        let mut api = test_api();
        let group = api.engine().config().config_group.clone();

        let mut store = MemoryConfigStore::new();
        store
            .set(&group, KEY_TRACKED_ITEMS, "[]")
            .expect("memory set");
        api.attach_store(Box::new(store));

        api.save().expect("save");
        let stored = api
            .store
            .as_ref()
            .expect("store attached")
            .get(&group, KEY_TRACKED_ITEMS)
            .expect("memory get");
        assert_eq!(stored, None);
    }

    #[test]
    fn load_without_store_reports_not_attached() {
        let mut api = test_api();
        assert!(matches!(api.load(), Err(PersistenceError::NotAttached)));
    }
}
