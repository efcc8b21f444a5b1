use crate::results::ItemReference;
use std::collections::HashSet;

/// Accumulates discovered references across extraction passes, keeping
/// each one exactly once in first-seen order.
#[derive(Debug, Default)]
pub struct DiscoverySet {
    seen: HashSet<ItemReference>,
    ordered: Vec<ItemReference>,
}

impl DiscoverySet {
    /// Create an empty discovery set
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one page snapshot in and returns only the references that
    /// were not already known, in the order they were given.
    pub fn add_batch(&mut self, batch: Vec<ItemReference>) -> Vec<ItemReference> {
        let mut fresh = Vec::new();
        for item in batch {
            if self.seen.insert(item.clone()) {
                self.ordered.push(item.clone());
                fresh.push(item);
            }
        }
        fresh
    }

    /// Number of unique references seen so far
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether nothing has been discovered yet
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// All unique references in discovery order
    pub fn ordered(&self) -> &[ItemReference] {
        &self.ordered
    }

    /// Consume the set, keeping the ordered discoveries
    pub fn into_ordered(self) -> Vec<ItemReference> {
        self.ordered
    }
}
