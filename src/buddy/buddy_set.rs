//! Split/coalesce engine for a single arena
//!
//! Implements the core buddy system over arena offsets using pooled linked
//! lists, one per order, that draw nodes from a shared node pool.

use crate::{AllocError, AllocResult};

#[cfg(feature = "log")]
use log::{error, trace};

use super::{
    buddy_block::{BuddyBlock, DEFAULT_MAX_ORDER},
    node_pool::NodePool,
    pooled_list::{PooledLinkedList, PooledListIter},
};

/// A buddy set - the free-list table of one arena
///
/// Only free blocks are tracked here. Allocated blocks are owned by the
/// caller, which hands them back through [`BuddySet::free_block`].
pub struct BuddySet {
    min_order: usize,
    max_order: usize,
    pool: NodePool,
    /// Free lists for each order
    free_lists: [PooledLinkedList; DEFAULT_MAX_ORDER + 1],
}

impl BuddySet {
    /// Create an empty buddy set (no free blocks, must call init())
    pub const fn new() -> Self {
        Self {
            min_order: 0,
            max_order: 0,
            pool: NodePool::new(),
            free_lists: [const { PooledLinkedList::new() }; DEFAULT_MAX_ORDER + 1],
        }
    }

    pub const fn min_order(&self) -> usize {
        self.min_order
    }

    pub const fn max_order(&self) -> usize {
        self.max_order
    }

    /// Reset the set so that a single free block of `max_order` covers
    /// offsets `[0, 2^max_order)`
    pub fn init(&mut self, min_order: usize, max_order: usize) {
        debug_assert!(min_order <= max_order && max_order <= DEFAULT_MAX_ORDER);

        for list in &mut self.free_lists {
            list.clear(&mut self.pool);
        }
        self.pool.reset();
        // Capacity hint only; the pool grows on demand once orders fragment
        self.pool.reserve(max_order - min_order + 1);

        self.min_order = min_order;
        self.max_order = max_order;
        self.free_lists[max_order].insert_sorted(&mut self.pool, BuddyBlock::new(max_order, 0));
    }

    /// Add a block to the appropriate list for its order
    fn add_block_to_order(&mut self, block: BuddyBlock) -> bool {
        if block.order < self.min_order || block.order > self.max_order {
            error!(
                "Order {} outside of arena orders [{}, {}]",
                block.order, self.min_order, self.max_order
            );
            return false;
        }

        self.free_lists[block.order].insert_sorted(&mut self.pool, block)
    }

    /// Take a free block of exactly `order`, splitting a larger one if needed
    pub fn alloc_block(&mut self, order: usize) -> AllocResult<BuddyBlock> {
        let order_needed = order.max(self.min_order);
        if order_needed > self.max_order {
            return Err(AllocError::NoMemory);
        }

        // Smallest non-empty free list at or above the required order
        let Some(found) = (order_needed..=self.max_order).find(|&o| !self.free_lists[o].is_empty())
        else {
            return Err(AllocError::NoMemory);
        };

        let mut block = self.free_lists[found]
            .pop_front(&mut self.pool)
            .ok_or(AllocError::NoMemory)?;

        // Split down to required order, keeping the lower half each time
        while block.order > order_needed {
            let Some((lower, upper)) = block.split() else {
                break;
            };
            trace!(
                "split order {} at {:#x} -> buddy {:#x} at order {}",
                block.order,
                block.offset,
                upper.offset,
                upper.order
            );

            // The upper half of a block just taken off a list cannot be free
            let pushed = self.add_block_to_order(upper);
            debug_assert!(pushed, "split buddy {:#x} already free", upper.offset);
            block = lower;
        }

        Ok(block)
    }

    /// Return a block to the set, merging it with free buddies as far up as
    /// possible
    ///
    /// Returns the final block that was placed on a free list, or `None` if it
    /// could not be placed (already free, or outside the arena orders).
    pub fn free_block(&mut self, block: BuddyBlock) -> Option<BuddyBlock> {
        debug_assert!(block.is_naturally_aligned());
        let mut current = block;

        while current.order < self.max_order {
            let buddy_offset = current.buddy_offset();
            if self.free_lists[current.order]
                .remove_by_offset(&mut self.pool, buddy_offset)
                .is_none()
            {
                break;
            }
            trace!(
                "merge order {} at {:#x} with buddy {:#x}",
                current.order,
                current.offset,
                buddy_offset
            );
            current = BuddyBlock::new(current.order + 1, current.parent_offset());
        }

        if !self.add_block_to_order(current) {
            error!(
                "Failed to push block to free list: offset={:#x}, order={}",
                current.offset, current.order
            );
            return None;
        }
        Some(current)
    }

    /// Number of free blocks at `order`
    pub fn free_count(&self, order: usize) -> usize {
        self.free_lists.get(order).map_or(0, PooledLinkedList::len)
    }

    /// Total bytes held by free blocks
    pub fn free_bytes(&self) -> usize {
        (self.min_order..=self.max_order)
            .map(|order| self.free_count(order) << order)
            .sum()
    }

    /// Whether the free block `(order, offset)` is on its free list
    pub fn is_free(&self, order: usize, offset: usize) -> bool {
        order <= DEFAULT_MAX_ORDER
            && self.free_lists[order]
                .find_by_offset(&self.pool, offset)
                .is_some()
    }

    /// Get free blocks of a specific order as an iterator
    pub fn free_blocks_by_order(&self, order: usize) -> PooledListIter<'_> {
        let order = order.min(DEFAULT_MAX_ORDER);
        self.free_lists[order].iter(&self.pool)
    }

    /// Get node pool statistics
    pub fn node_pool_stats(&self) -> super::node_pool::NodePoolStats {
        self.pool.get_stats()
    }
}

impl Default for BuddySet {
    fn default() -> Self {
        Self::new()
    }
}
