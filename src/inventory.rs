use std::fmt;

use serde::{Deserialize, Serialize};

/// A carried item. Two items are the same item when their ids match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    pub id: String,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Capacity-bounded, duplicate-free item collection in insertion order.
#[derive(Debug, Clone)]
pub struct Inventory {
    capacity: usize,
    items: Vec<Item>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn has(&self, item: &Item) -> bool {
        self.items.contains(item)
    }

    /// Returns `false` without changing anything if the item is already held
    /// or there is no room left.
    pub fn add(&mut self, item: Item) -> bool {
        if self.is_full() || self.has(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, item: &Item) -> bool {
        match self.items.iter().position(|held| held == item) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Items in the order they were picked up.
    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_enforced() {
        for k in 0..6 {
            let mut inventory = Inventory::new(k);
            for i in 0..k {
                assert!(inventory.add(Item::new(format!("item{i}"))));
            }
            assert!(!inventory.add(Item::new("one_too_many")));
            assert_eq!(inventory.len(), k);
        }
    }

    #[test]
    fn test_duplicate_add_is_refused() {
        let mut inventory = Inventory::new(4);
        assert!(inventory.add(Item::new("books")));
        assert!(!inventory.add(Item::new("books")));
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn test_remove_absent_item() {
        let mut inventory = Inventory::new(4);
        assert!(!inventory.remove(&Item::new("zip_tie")));
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut inventory = Inventory::new(4);
        for id in ["a", "b", "c"] {
            inventory.add(Item::new(id));
        }
        assert!(inventory.remove(&Item::new("b")));
        let ids: Vec<&str> = inventory.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn test_clear_frees_capacity() {
        let mut inventory = Inventory::new(1);
        inventory.add(Item::new("key"));
        assert!(inventory.is_full());
        inventory.clear();
        assert!(inventory.is_empty());
        assert!(inventory.add(Item::new("key")));
    }
}
