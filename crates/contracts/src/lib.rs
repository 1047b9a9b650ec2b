//! Cross-boundary contracts for the container tracker: engine, API facade,
//! and persistence all speak these types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod quantity;

pub const SCHEMA_VERSION_V1: &str = "1.0";
pub const DEFAULT_CATEGORY: &str = "Default";

/// A named item-holding location in the host system. `container_id` is the
/// canonical identity; alternate raw identities are resolved by the registry,
/// never by registering a second `Container` with the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Container {
    pub container_id: i32,
    pub display_name: String,
    pub config_key: String,
}

impl Container {
    pub fn new(
        container_id: i32,
        display_name: impl Into<String>,
        config_key: impl Into<String>,
    ) -> Self {
        Self {
            container_id,
            display_name: display_name.into(),
            config_key: config_key.into(),
        }
    }
}

/// One user tracking intent: an item, an optional goal, and the last known
/// per-container breakdown. `current_amount` and `container_quantities` are
/// derived by reconciliation but persisted so totals survive sessions in
/// which a container is never re-opened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackedItem {
    pub item_id: i32,
    pub item_name: String,
    #[serde(default)]
    pub current_amount: u64,
    pub goal_amount: Option<u64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub container_quantities: BTreeMap<String, u64>,
}

impl TrackedItem {
    pub fn new(
        item_id: i32,
        item_name: impl Into<String>,
        goal_amount: Option<u64>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            item_name: item_name.into(),
            current_amount: 0,
            goal_amount,
            category: category.into(),
            container_quantities: BTreeMap::new(),
        }
    }

    pub fn remaining(&self) -> u64 {
        match self.goal_amount {
            Some(goal) => goal.saturating_sub(self.current_amount),
            None => 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self.goal_amount {
            Some(goal) => self.current_amount >= goal,
            None => false,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            item_id: self.item_id,
            category: self.category.clone(),
        }
    }
}

/// Composite storage key: the same item may be tracked independently in
/// several categories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub item_id: i32,
    pub category: String,
}

impl ItemKey {
    pub fn new(item_id: i32, category: impl Into<String>) -> Self {
        Self {
            item_id,
            category: category.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.item_id, self.category)
    }
}

/// Host-supplied configuration. Enablement is polled per container per
/// reconciliation pass; a key absent from `enabled` counts as enabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerConfig {
    pub schema_version: String,
    pub config_group: String,
    #[serde(default)]
    pub enabled: BTreeMap<String, bool>,
    pub default_category: String,
    pub debounce_ticks: u64,
}

impl TrackerConfig {
    pub fn is_enabled(&self, config_key: &str) -> bool {
        self.enabled.get(config_key).copied().unwrap_or(true)
    }

    pub fn set_enabled(&mut self, config_key: impl Into<String>, enabled: bool) {
        self.enabled.insert(config_key.into(), enabled);
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            config_group: "resourcetracker".to_string(),
            enabled: BTreeMap::new(),
            default_category: DEFAULT_CATEGORY.to_string(),
            debounce_ticks: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    AddItem,
    RemoveItem,
    SetGoal,
    RegisterCategory,
    RemoveCategory,
    RenameCategory,
    MoveCategory,
    ResetAll,
}

/// Mutation requests from the presentation layer. These are queued onto the
/// data-source thread and applied there; the UI never touches engine state
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandPayload {
    AddItem {
        item_id: i32,
        item_name: String,
        goal_amount: Option<u64>,
        category: String,
    },
    RemoveItem {
        item_id: i32,
        category: String,
    },
    SetGoal {
        item_id: i32,
        category: String,
        goal_amount: Option<u64>,
    },
    RegisterCategory {
        name: String,
    },
    RemoveCategory {
        name: String,
    },
    RenameCategory {
        old_name: String,
        new_name: String,
    },
    MoveCategory {
        name: String,
        new_index: usize,
    },
    ResetAll,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    pub schema_version: String,
    pub command_id: String,
    pub command_type: CommandType,
    pub payload: CommandPayload,
}

impl Command {
    pub fn new(
        command_id: impl Into<String>,
        command_type: CommandType,
        payload: CommandPayload,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command_id.into(),
            command_type,
            payload,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DuplicateContainer,
    CategoryNotFound,
    DuplicateCategoryName,
    ItemNotFound,
    InvalidCommand,
    ContractVersionUnsupported,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_code, self.message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResult {
    pub schema_version: String,
    pub command_id: String,
    pub accepted: bool,
    pub error: Option<ApiError>,
}

impl CommandResult {
    pub fn accepted(command: &Command) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command.command_id.clone(),
            accepted: true,
            error: None,
        }
    }

    pub fn rejected(command: &Command, error: ApiError) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command.command_id.clone(),
            accepted: false,
            error: Some(error),
        }
    }
}
