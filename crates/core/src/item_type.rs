//! Item type descriptors and the registry that resolves them by key.

use crate::item::Item;
use crate::key::{ItemKey, ItemKeyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Shared handle to an immutable item type.
pub type ItemTypeRef = Arc<ItemType>;

/// Stack limit used when a definition leaves `max_stack` out.
pub const DEFAULT_MAX_STACK: u32 = 100;

/// Immutable description of a kind of item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemType {
    /// Registry key.
    pub key: ItemKey,
    /// Human-readable name.
    pub display_name: String,
    /// Flavour text.
    #[serde(default)]
    pub description: String,
    /// Largest stack a single item instance may hold.
    pub max_stack: u32,
    /// Non-stackable types always behave as `max_stack == 1`.
    pub stackable: bool,
}

impl ItemType {
    /// Stackable type with the given limit.
    pub fn new(key: ItemKey, display_name: impl Into<String>, max_stack: u32) -> Self {
        Self {
            key,
            display_name: display_name.into(),
            description: String::new(),
            max_stack: max_stack.max(1),
            stackable: true,
        }
    }

    /// Single-instance type (tools, keys, ...).
    pub fn unstackable(key: ItemKey, display_name: impl Into<String>) -> Self {
        Self {
            stackable: false,
            ..Self::new(key, display_name, 1)
        }
    }

    /// Effective stack limit.
    pub fn max_stack(&self) -> u32 {
        if self.stackable {
            self.max_stack.max(1)
        } else {
            1
        }
    }
}

/// Item creation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// No type is registered under the key.
    #[error("item type `{0}` does not exist in the registry")]
    UnknownItemType(String),
}

/// Failures while loading item definitions.
#[derive(Debug, Error)]
pub enum RegistryLoadError {
    /// The definitions file could not be read.
    #[error("failed to read item definitions: {0}")]
    Io(#[from] std::io::Error),
    /// The definitions were not valid JSON.
    #[error("failed to parse item definitions: {0}")]
    Parse(#[from] serde_json::Error),
    /// A definition carried a malformed key.
    #[error("invalid item key: {0}")]
    Key(#[from] ItemKeyError),
    /// Two definitions share a key.
    #[error("item type `{0}` is defined more than once")]
    Duplicate(ItemKey),
}

/// On-disk shape of a single item type.
#[derive(Debug, Deserialize)]
struct ItemTypeDefinition {
    key: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_max_stack")]
    max_stack: u32,
    #[serde(default = "default_stackable")]
    stackable: bool,
}

fn default_max_stack() -> u32 {
    DEFAULT_MAX_STACK
}

fn default_stackable() -> bool {
    true
}

/// Lookup table of item types keyed by [`ItemKey`].
///
/// Iteration order is the key order, so listings are stable between runs.
#[derive(Debug, Default, Clone)]
pub struct ItemTypeRegistry {
    types: BTreeMap<ItemKey, ItemTypeRef>,
}

impl ItemTypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load definitions from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, RegistryLoadError> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Load definitions from an in-memory JSON array.
    pub fn from_json_str(input: &str) -> Result<Self, RegistryLoadError> {
        let defs: Vec<ItemTypeDefinition> = serde_json::from_str(input)?;
        let mut registry = Self::new();
        for def in defs {
            let key = ItemKey::parse(&def.key)?;
            if registry.types.contains_key(&key) {
                return Err(RegistryLoadError::Duplicate(key));
            }
            registry.register(ItemType {
                key,
                display_name: def.name,
                description: def.description,
                max_stack: def.max_stack.max(1),
                stackable: def.stackable,
            });
        }
        Ok(registry)
    }

    /// Insert or replace a type, returning the shared handle.
    pub fn register(&mut self, item_type: ItemType) -> ItemTypeRef {
        let handle = Arc::new(item_type);
        self.types.insert(handle.key.clone(), Arc::clone(&handle));
        handle
    }

    /// Resolve a type by key.
    pub fn lookup(&self, key: &ItemKey) -> Option<ItemTypeRef> {
        self.types.get(key).cloned()
    }

    /// Build an unbound item of the keyed type.
    ///
    /// `stack` is clamped into `1..=max_stack`.
    pub fn create_item(&self, key: &ItemKey, stack: u32) -> Result<Item, ItemError> {
        match self.lookup(key) {
            Some(item_type) => {
                let stack = stack.clamp(1, item_type.max_stack());
                Ok(Item::new(item_type, stack))
            }
            None => {
                warn!(%key, "Item type does not exist in the registry");
                Err(ItemError::UnknownItemType(key.to_string()))
            }
        }
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered types in key order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemTypeRef> {
        self.types.values()
    }
}
