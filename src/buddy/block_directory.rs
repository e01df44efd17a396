//! Block directory
//!
//! Records every allocated block by offset so that releases can be validated
//! and resolved back to their order, and keeps per-order used counters.

use alloc::collections::BTreeMap;

use super::buddy_block::{BuddyBlock, DEFAULT_MAX_ORDER};

/// Directory of allocated blocks keyed by arena offset
pub struct BlockDirectory {
    allocated: BTreeMap<usize, usize>,
    used_by_order: [usize; DEFAULT_MAX_ORDER + 1],
}

impl BlockDirectory {
    pub const fn new() -> Self {
        Self {
            allocated: BTreeMap::new(),
            used_by_order: [0; DEFAULT_MAX_ORDER + 1],
        }
    }

    /// Forget every allocation
    pub fn clear(&mut self) {
        self.allocated.clear();
        self.used_by_order = [0; DEFAULT_MAX_ORDER + 1];
    }

    /// Record `block` as allocated
    ///
    /// Returns `false` if the offset is already recorded.
    pub fn insert(&mut self, block: BuddyBlock) -> bool {
        if block.order > DEFAULT_MAX_ORDER || self.allocated.contains_key(&block.offset) {
            return false;
        }
        self.allocated.insert(block.offset, block.order);
        self.used_by_order[block.order] += 1;
        true
    }

    /// Look up the allocated block starting at `offset`
    pub fn get(&self, offset: usize) -> Option<BuddyBlock> {
        self.allocated
            .get(&offset)
            .map(|&order| BuddyBlock::new(order, offset))
    }

    /// Remove the allocated block starting at `offset`
    pub fn remove(&mut self, offset: usize) -> Option<BuddyBlock> {
        let order = self.allocated.remove(&offset)?;
        self.used_by_order[order] -= 1;
        Some(BuddyBlock::new(order, offset))
    }

    /// Number of allocated blocks at `order`
    pub fn used_count(&self, order: usize) -> usize {
        self.used_by_order.get(order).copied().unwrap_or(0)
    }

    /// Number of allocated blocks across all orders
    pub fn len(&self) -> usize {
        self.allocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }

    /// Total bytes held by allocated blocks
    pub fn used_bytes(&self) -> usize {
        self.used_by_order
            .iter()
            .enumerate()
            .map(|(order, &count)| count << order)
            .sum()
    }

    /// Allocated blocks in ascending offset order
    pub fn iter(&self) -> impl Iterator<Item = BuddyBlock> + '_ {
        self.allocated
            .iter()
            .map(|(&offset, &order)| BuddyBlock::new(order, offset))
    }
}

impl Default for BlockDirectory {
    fn default() -> Self {
        Self::new()
    }
}
