//! Item types, item identities and the registry of types usable on a board.
//!
//! This module contains:
//! - `ItemType`: opaque category name, compared by equality only
//! - `ItemTypeRegistry`: the ordered pool of types a level is filled from
//! - `Item`: one movable piece, identified by a session-unique `ItemId`
//! - `ItemIdAllocator`: hands out fresh ids for a session

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an item. Two items match when their types are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemType(String);

impl ItemType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Identity of a single item, unique within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A placed or movable game piece.
///
/// An item is owned by exactly one board cell or one container slot at a
/// time; it is moved between them by value, never shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub item_type: ItemType,
}

impl Item {
    pub fn new(id: ItemId, item_type: ItemType) -> Self {
        Self { id, item_type }
    }
}

/// Monotonic id source, owned by the session so ids stay unique across levels
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemIdAllocator {
    next: u32,
}

impl ItemIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ItemId {
        let id = ItemId(self.next);
        self.next += 1;
        id
    }

    /// Create a new item of the given type with a fresh id
    pub fn make(&mut self, item_type: ItemType) -> Item {
        Item::new(self.next_id(), item_type)
    }
}

/// The finite set of item categories a board may be filled with.
///
/// Keeps insertion order and silently drops duplicates, so iteration is
/// deterministic for seeded fills.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTypeRegistry {
    types: Vec<ItemType>,
}

impl ItemTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a list of type names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.register(ItemType::new(name));
        }
        registry
    }

    /// Add a type. Returns false if it was already registered.
    pub fn register(&mut self, item_type: ItemType) -> bool {
        if self.contains(&item_type) {
            return false;
        }
        self.types.push(item_type);
        true
    }

    pub fn contains(&self, item_type: &ItemType) -> bool {
        self.types.contains(item_type)
    }

    pub fn get(&self, index: usize) -> Option<&ItemType> {
        self.types.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<ItemType> for ItemTypeRegistry {
    fn from_iter<T: IntoIterator<Item = ItemType>>(iter: T) -> Self {
        let mut registry = Self::new();
        for item_type in iter {
            registry.register(item_type);
        }
        registry
    }
}
