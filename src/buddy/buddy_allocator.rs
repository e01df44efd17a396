//! Buddy arena allocator
//!
//! Provides the caller-facing handle over one fixed arena. Addresses handed
//! out are `base + offset`; the handle resolves them back to blocks through
//! its block directory, so the arena memory itself is never touched.

use alloc::string::String;

use crate::{AllocError, AllocResult, BaseAllocator, ByteAllocator};

#[cfg(feature = "log")]
use log::{debug, info, warn};

use super::{
    block_directory::BlockDirectory,
    buddy_block::{order_for_size, BuddyBlock, DEFAULT_MAX_ORDER},
    buddy_set::BuddySet,
    pooled_list::PooledListIter,
    stats::{BuddyStats, MemoryStatsReporter},
};

/// Buddy allocator over a single fixed arena
///
/// `MIN_ORDER` is the order of the smallest block handed out; requests are
/// rounded up to at least `2^MIN_ORDER` bytes.
pub struct BuddyArena<const MIN_ORDER: usize = 0> {
    base: usize,
    capacity: usize,
    set: BuddySet,
    directory: BlockDirectory,
}

impl<const MIN_ORDER: usize> BuddyArena<MIN_ORDER> {
    /// Create an arena with no memory, must call init() before allocating
    pub const fn new() -> Self {
        Self {
            base: 0,
            capacity: 0,
            set: BuddySet::new(),
            directory: BlockDirectory::new(),
        }
    }

    /// Create an arena over `[base, base + capacity)`
    pub fn with_region(base: usize, capacity: usize) -> AllocResult<Self> {
        let mut arena = Self::new();
        arena.init(base, capacity)?;
        Ok(arena)
    }

    /// Check that `[base, base + capacity)` can back an arena, returning its
    /// top order
    fn validate_region(base: usize, capacity: usize) -> AllocResult<usize> {
        if MIN_ORDER > DEFAULT_MAX_ORDER {
            warn!(
                "buddy arena: min order {} exceeds maximum order {}",
                MIN_ORDER, DEFAULT_MAX_ORDER
            );
            return Err(AllocError::InvalidConfiguration);
        }
        if !capacity.is_power_of_two() {
            warn!("buddy arena: capacity {:#x} is not a power of two", capacity);
            return Err(AllocError::InvalidConfiguration);
        }

        let max_order = capacity.trailing_zeros() as usize;
        if max_order < MIN_ORDER || max_order > DEFAULT_MAX_ORDER {
            warn!(
                "buddy arena: capacity {:#x} outside of [{:#x}, {:#x}]",
                capacity,
                1u64 << MIN_ORDER,
                1u64 << DEFAULT_MAX_ORDER
            );
            return Err(AllocError::InvalidConfiguration);
        }
        if base.checked_add(capacity).is_none() {
            warn!(
                "buddy arena: region at {:#x} with capacity {:#x} overflows",
                base, capacity
            );
            return Err(AllocError::InvalidConfiguration);
        }

        Ok(max_order)
    }

    /// Initialize (or reset) the arena over `[base, base + capacity)`
    ///
    /// All outstanding allocations are discarded. On error the previous state
    /// is kept.
    pub fn init(&mut self, base: usize, capacity: usize) -> AllocResult {
        let max_order = Self::validate_region(base, capacity)?;

        self.base = base;
        self.capacity = capacity;
        self.directory.clear();
        self.set.init(MIN_ORDER, max_order);

        self.print_layout();
        Ok(())
    }

    pub const fn base(&self) -> usize {
        self.base
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn min_order(&self) -> usize {
        MIN_ORDER
    }

    pub const fn max_order(&self) -> usize {
        self.set.max_order()
    }

    pub const fn is_initialized(&self) -> bool {
        self.capacity != 0
    }

    /// Allocate a block of at least `size` bytes and return its address
    pub fn allocate(&mut self, size: usize) -> AllocResult<usize> {
        if size == 0 {
            return Err(AllocError::InvalidParam);
        }
        if size > self.capacity {
            debug!(
                "buddy arena: request of {} bytes exceeds capacity {}",
                size, self.capacity
            );
            return Err(AllocError::NoMemory);
        }

        let order = order_for_size(size).max(MIN_ORDER);
        let block = match self.set.alloc_block(order) {
            Ok(block) => block,
            Err(e) => {
                #[cfg(feature = "log")]
                if log::log_enabled!(log::Level::Debug) {
                    MemoryStatsReporter::log_alloc_failure(&self.stats(), size, order);
                }
                return Err(e);
            }
        };

        if !self.directory.insert(block) {
            // A freshly split block can never already be recorded
            self.set.free_block(block);
            return Err(AllocError::NoMemory);
        }

        Ok(self.base + block.offset)
    }

    /// Resolve an address to its offset inside the arena
    fn offset_of(&self, addr: usize) -> Option<usize> {
        addr.checked_sub(self.base)
            .filter(|&offset| offset < self.capacity)
    }

    /// Release the block at `addr`, merging it with free buddies
    pub fn release(&mut self, addr: usize) -> AllocResult {
        let Some(block) = self
            .offset_of(addr)
            .and_then(|offset| self.directory.remove(offset))
        else {
            warn!(
                "buddy arena: release of {:#x}: not an allocated block",
                addr
            );
            return Err(AllocError::NotAllocated);
        };

        if self.set.free_block(block).is_none() {
            return Err(AllocError::NotAllocated);
        }
        Ok(())
    }

    /// Size of the block backing the allocation at `addr`
    pub fn block_size_of(&self, addr: usize) -> Option<usize> {
        let offset = self.offset_of(addr)?;
        self.directory.get(offset).map(|block| block.size())
    }

    /// Allocated blocks as `(address, block)` pairs, lowest address first
    pub fn allocations(&self) -> impl Iterator<Item = (usize, BuddyBlock)> + '_ {
        self.directory
            .iter()
            .map(move |block| (self.base + block.offset, block))
    }

    /// Free blocks of `order`, lowest offset first
    pub fn free_blocks_by_order(&self, order: usize) -> PooledListIter<'_> {
        self.set.free_blocks_by_order(order)
    }

    /// Snapshot of the arena usage
    pub fn stats(&self) -> BuddyStats {
        let mut stats = BuddyStats::new();
        if !self.is_initialized() {
            return stats;
        }

        stats.total_bytes = self.capacity;
        stats.min_order = MIN_ORDER;
        stats.max_order = self.set.max_order();
        for order in stats.orders() {
            stats.free_blocks_by_order[order] = self.set.free_count(order);
            stats.used_blocks_by_order[order] = self.directory.used_count(order);
        }
        stats.free_bytes = self.set.free_bytes();
        stats.used_bytes = self.capacity - stats.free_bytes;
        stats
    }

    /// Per-order table of free and used blocks followed by the allocations
    pub fn dump(&self) -> String {
        MemoryStatsReporter::dump(&self.stats(), self.allocations())
    }

    /// Print the arena geometry and free block distribution
    pub fn print_layout(&self) {
        info!("========== Buddy Arena Layout ==========");
        info!(
            "  Address range: [{:#x}, {:#x})",
            self.base,
            self.base + self.capacity
        );
        info!(
            "  Orders: [{}, {}], capacity {} bytes",
            MIN_ORDER,
            self.set.max_order(),
            self.capacity
        );
        for order in MIN_ORDER..=self.set.max_order() {
            let block_count = self.set.free_count(order);
            if block_count > 0 {
                info!(
                    "    Order {}: {} free blocks (size {} bytes each)",
                    order,
                    block_count,
                    1usize << order
                );
            }
        }
        info!("  Allocated blocks: {}", self.directory.len());
        info!("========================================");
    }
}

impl<const MIN_ORDER: usize> Default for BuddyArena<MIN_ORDER> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MIN_ORDER: usize> BaseAllocator for BuddyArena<MIN_ORDER> {
    fn init(&mut self, start: usize, size: usize) -> AllocResult {
        BuddyArena::init(self, start, size)
    }
}

impl<const MIN_ORDER: usize> ByteAllocator for BuddyArena<MIN_ORDER> {
    fn alloc(&mut self, size: usize) -> AllocResult<usize> {
        self.allocate(size)
    }

    fn dealloc(&mut self, pos: usize) -> AllocResult {
        self.release(pos)
    }

    fn total_bytes(&self) -> usize {
        self.capacity
    }

    fn used_bytes(&self) -> usize {
        self.directory.used_bytes()
    }

    fn available_bytes(&self) -> usize {
        self.set.free_bytes()
    }
}
