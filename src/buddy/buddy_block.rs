//! Buddy block metadata
//!
//! Represents a block of the arena in the buddy system by its order and its
//! byte offset from the arena base.

use core::cmp::{Ord, PartialOrd};

/// Maximum order supported
pub const DEFAULT_MAX_ORDER: usize = 32; // Support arenas up to 4GB (2^32 bytes)

/// Buddy block metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct BuddyBlock {
    pub order: usize,
    pub offset: usize,
}

impl BuddyBlock {
    /// Create a new buddy block
    pub const fn new(order: usize, offset: usize) -> Self {
        Self { order, offset }
    }

    /// Size of this block in bytes
    pub const fn size(&self) -> usize {
        1 << self.order
    }

    /// Calculate the buddy offset for this block
    /// The buddy is the other half of the parent block at the next higher order
    /// For a block at order k with offset A, its buddy is at A ^ 2^k
    pub const fn buddy_offset(&self) -> usize {
        self.offset ^ (1 << self.order)
    }

    /// Offset of the parent block (the lower of the two buddies)
    pub const fn parent_offset(&self) -> usize {
        self.offset & !(1 << self.order)
    }

    /// Split this block into its two children at `order - 1`
    ///
    /// Returns `None` for order 0 blocks.
    pub const fn split(&self) -> Option<(BuddyBlock, BuddyBlock)> {
        if self.order == 0 {
            return None;
        }
        let order = self.order - 1;
        Some((
            BuddyBlock::new(order, self.offset),
            BuddyBlock::new(order, self.offset + (1 << order)),
        ))
    }

    /// Whether the offset sits on the natural boundary of this block's size
    pub const fn is_naturally_aligned(&self) -> bool {
        crate::is_aligned(self.offset, self.size())
    }
}

impl PartialOrd for BuddyBlock {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuddyBlock {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        (self.offset, self.order).cmp(&(other.offset, other.order))
    }
}

impl PartialEq for BuddyBlock {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.order == other.order
    }
}

impl Eq for BuddyBlock {}

/// Smallest order whose block size is at least `size` bytes
pub(crate) fn order_for_size(size: usize) -> usize {
    if size.is_power_of_two() {
        size.trailing_zeros() as usize
    } else {
        size.next_power_of_two().trailing_zeros() as usize
    }
}
