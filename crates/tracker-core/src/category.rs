//! User-controlled category display order, independent of item insertion
//! order. Persisted as a plain ordered list of names.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    NotFound(String),
    DuplicateName(String),
}

impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "category not found: {name}"),
            Self::DuplicateName(name) => write!(f, "category already exists: {name}"),
        }
    }
}

impl Error for CategoryError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryOrder {
    order: Vec<String>,
}

impl CategoryOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds from a persisted list. The loaded order is authoritative;
    /// duplicates from older blobs collapse to their first position.
    pub fn load(names: Vec<String>) -> Self {
        let mut order = Self::new();
        for name in names {
            order.register(&name);
        }
        order
    }

    /// Appends if absent. Idempotent.
    pub fn register(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.order.push(name.to_string());
        true
    }

    /// Removes if present. Idempotent.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.order.len();
        self.order.retain(|existing| existing != name);
        self.order.len() != before
    }

    /// In-place rename preserving position. Collisions are checked
    /// case-insensitively so "ores" cannot coexist with "Ores", but renaming
    /// a category to a different casing of itself is allowed.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<(), CategoryError> {
        let Some(index) = self.position(old_name) else {
            return Err(CategoryError::NotFound(old_name.to_string()));
        };

        let collides = self.order.iter().enumerate().any(|(i, existing)| {
            i != index && existing.eq_ignore_ascii_case(new_name)
        });
        if collides {
            return Err(CategoryError::DuplicateName(new_name.to_string()));
        }

        self.order[index] = new_name.to_string();
        Ok(())
    }

    /// Remove-then-insert; `new_index` is clamped to the list bounds. A name
    /// not currently present is simply inserted.
    pub fn reorder(&mut self, name: &str, new_index: usize) {
        self.remove(name);
        let index = new_index.min(self.order.len());
        self.order.insert(index, name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|existing| existing == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|existing| existing == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}
