use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    NotAttached,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::NotAttached => write!(f, "profile store is not attached"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Key-value configuration backend. Values are opaque strings; the facade
/// treats an empty string the same as a missing entry so stores may
/// implement deletion either way.
pub trait ConfigStore {
    fn get(&self, group: &str, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, group: &str, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn unset(&mut self, group: &str, key: &str) -> Result<(), PersistenceError>;
}

/// In-memory store for tests and hosts without a profile database.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: BTreeMap<(String, String), String>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, group: &str, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self
            .entries
            .get(&(group.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&mut self, group: &str, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .insert((group.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn unset(&mut self, group: &str, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(&(group.to_string(), key.to_string()));
        Ok(())
    }
}

#[derive(Debug)]
pub struct SqliteProfileStore {
    conn: Connection,
}

impl SqliteProfileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS config_entries (
                config_group TEXT NOT NULL,
                config_key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (config_group, config_key)
            );

            CREATE INDEX IF NOT EXISTS idx_config_entries_group ON config_entries(config_group);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
             VALUES(1, 'initial_v1', datetime('now'))",
            [],
        )?;

        Ok(())
    }
}

impl ConfigStore for SqliteProfileStore {
    fn get(&self, group: &str, key: &str) -> Result<Option<String>, PersistenceError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value
                 FROM config_entries
                 WHERE config_group = ?1 AND config_key = ?2",
                params![group, key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&mut self, group: &str, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO config_entries (config_group, config_key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(config_group, config_key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![group, key, value],
        )?;

        Ok(())
    }

    fn unset(&mut self, group: &str, key: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "DELETE FROM config_entries
             WHERE config_group = ?1 AND config_key = ?2",
            params![group, key],
        )?;

        Ok(())
    }
}
