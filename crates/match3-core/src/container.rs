//! The staging container ("bottom container").
//!
//! A fixed-capacity, left-packed sequence of items. Items arrive at the end;
//! when enough items of one type are present they are cleared as a group and
//! the survivors slide left, keeping their relative order.

use crate::item::{Item, ItemId, ItemType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Default number of same-typed items that form a match
pub const DEFAULT_MATCH_SIZE: usize = 3;

/// Index of a container slot, `0..capacity`
pub type SlotIndex = usize;

/// Returned by [`Container::add_item`] when every slot is taken.
///
/// Carries the rejected item back to the caller so it is never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Container is full ({capacity} slots)")]
pub struct ContainerFullError {
    pub capacity: usize,
    pub item: Item,
}

/// A group of same-typed items ready to be cleared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleCandidate {
    pub item_type: ItemType,
    /// Identities in container order, earliest first
    pub items: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    capacity: usize,
    match_size: usize,
    items: Vec<Item>,
}

impl Container {
    /// Create an empty container that clears groups of three
    pub fn new(capacity: usize) -> Self {
        Self::with_match_size(capacity, DEFAULT_MATCH_SIZE)
    }

    pub fn with_match_size(capacity: usize, match_size: usize) -> Self {
        Self {
            capacity,
            match_size: match_size.max(1),
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn match_size(&self) -> usize {
        self.match_size
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in slot order. Slot `i` holds `items()[i]`.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    pub fn slot_of(&self, id: ItemId) -> Option<SlotIndex> {
        self.items.iter().position(|i| i.id == id)
    }

    /// Append an item and return the slot it landed in
    pub fn add_item(&mut self, item: Item) -> Result<SlotIndex, ContainerFullError> {
        if self.is_full() {
            return Err(ContainerFullError {
                capacity: self.capacity,
                item,
            });
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    /// Remove an item by identity. Absent items are ignored.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let index = self.slot_of(id)?;
        Some(self.items.remove(index))
    }

    /// Scan slots in order and return the first type whose running count
    /// reaches `match_size`, together with those earliest items of that type.
    pub fn find_triple_candidate(&self) -> Option<TripleCandidate> {
        let mut groups: HashMap<&ItemType, Vec<ItemId>> = HashMap::new();
        for item in &self.items {
            let group = groups.entry(&item.item_type).or_default();
            group.push(item.id);
            if group.len() == self.match_size {
                return Some(TripleCandidate {
                    item_type: item.item_type.clone(),
                    items: group.clone(),
                });
            }
        }
        None
    }

    /// Remove the given items and compact the survivors leftward.
    ///
    /// Returns the removed items in their former slot order.
    pub fn clear_triple(&mut self, ids: &[ItemId]) -> Vec<Item> {
        let (cleared, kept): (Vec<Item>, Vec<Item>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|i| ids.contains(&i.id));
        self.items = kept;
        cleared
    }

    /// Remove all items. Safe to call on an empty container.
    pub fn reset(&mut self) -> Vec<Item> {
        std::mem::take(&mut self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemIdAllocator;
    use pretty_assertions::assert_eq;

    fn stage(container: &mut Container, ids: &mut ItemIdAllocator, types: &[&str]) -> Vec<Item> {
        types
            .iter()
            .map(|t| {
                let item = ids.make(ItemType::new(*t));
                container.add_item(item.clone()).unwrap();
                item
            })
            .collect()
    }

    fn types_of(container: &Container) -> Vec<&str> {
        container.items().iter().map(|i| i.item_type.as_str()).collect()
    }

    #[test]
    fn test_add_returns_slot_index() {
        let mut container = Container::new(3);
        let mut ids = ItemIdAllocator::new();
        assert_eq!(container.add_item(ids.make("a".into())), Ok(0));
        assert_eq!(container.add_item(ids.make("b".into())), Ok(1));
        assert!(!container.is_full());
    }

    #[test]
    fn test_add_when_full_fails_and_keeps_count() {
        let mut container = Container::new(2);
        let mut ids = ItemIdAllocator::new();
        stage(&mut container, &mut ids, &["a", "b"]);
        assert!(container.is_full());

        let rejected = ids.make("c".into());
        let err = container.add_item(rejected.clone()).unwrap_err();
        assert_eq!(err.capacity, 2);
        assert_eq!(err.item, rejected);
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_triple_picks_first_group_reaching_threshold() {
        let mut container = Container::new(7);
        let mut ids = ItemIdAllocator::new();
        let staged = stage(&mut container, &mut ids, &["A", "A", "B", "B", "B", "A"]);

        // A is seen first, but B completes its group earlier in the scan
        let candidate = container.find_triple_candidate().unwrap();
        assert_eq!(candidate.item_type, ItemType::new("B"));
        assert_eq!(candidate.items, vec![staged[2].id, staged[3].id, staged[4].id]);

        container.clear_triple(&candidate.items);
        assert_eq!(types_of(&container), vec!["A", "A", "A"]);
        let survivors: Vec<ItemId> = container.items().iter().map(|i| i.id).collect();
        assert_eq!(survivors, vec![staged[0].id, staged[1].id, staged[5].id]);
    }

    #[test]
    fn test_earliest_items_of_type_are_selected() {
        let mut container = Container::new(7);
        let mut ids = ItemIdAllocator::new();
        let staged = stage(&mut container, &mut ids, &["A", "C", "A", "C", "A", "A"]);

        let candidate = container.find_triple_candidate().unwrap();
        assert_eq!(candidate.items, vec![staged[0].id, staged[2].id, staged[4].id]);
    }

    #[test]
    fn test_triple_clear_compacts_in_order() {
        let mut container = Container::new(7);
        let mut ids = ItemIdAllocator::new();
        let staged = stage(&mut container, &mut ids, &["A", "B", "B", "C", "B", "A"]);

        let candidate = container.find_triple_candidate().unwrap();
        assert_eq!(candidate.item_type, ItemType::new("B"));

        let cleared = container.clear_triple(&candidate.items);
        assert_eq!(cleared.len(), 3);
        assert_eq!(types_of(&container), vec!["A", "C", "A"]);
        assert_eq!(container.slot_of(staged[5].id), Some(2));
    }

    #[test]
    fn test_no_candidate_below_threshold() {
        let mut container = Container::new(7);
        let mut ids = ItemIdAllocator::new();
        stage(&mut container, &mut ids, &["A", "B", "A", "B"]);
        assert!(container.find_triple_candidate().is_none());
    }

    #[test]
    fn test_configured_match_size() {
        let mut container = Container::with_match_size(7, 4);
        let mut ids = ItemIdAllocator::new();
        stage(&mut container, &mut ids, &["A", "A", "A"]);
        assert!(container.find_triple_candidate().is_none());

        stage(&mut container, &mut ids, &["A"]);
        assert_eq!(container.find_triple_candidate().unwrap().items.len(), 4);
    }

    #[test]
    fn test_remove_missing_item_is_noop() {
        let mut container = Container::new(3);
        let mut ids = ItemIdAllocator::new();
        stage(&mut container, &mut ids, &["A"]);
        assert!(container.remove_item(ItemId(999)).is_none());
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut container = Container::new(3);
        let mut ids = ItemIdAllocator::new();
        stage(&mut container, &mut ids, &["A", "B"]);

        assert_eq!(container.reset().len(), 2);
        assert!(container.is_empty());
        assert!(container.reset().is_empty());
        assert!(container.is_empty());
    }
}
