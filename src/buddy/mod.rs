//! Buddy arena allocator module
//!
//! This module provides the complete buddy system for a single fixed arena:
//! - Address-sorted free lists per order, backed by one shared node pool
//! - A block directory for validating releases
//! - Split/coalesce engine and the caller-facing arena handle
//! - Statistics and textual dumps

pub mod block_directory;
pub mod buddy_allocator;
pub mod buddy_block;
pub mod buddy_set;
pub mod node_pool;
pub mod pooled_list;
pub mod stats;

pub use block_directory::BlockDirectory;
pub use buddy_allocator::BuddyArena;
pub use buddy_block::{BuddyBlock, DEFAULT_MAX_ORDER};
pub use buddy_set::BuddySet;
pub use node_pool::{ListNode, NodePool};
pub use pooled_list::{PooledLinkedList, PooledListIter};
pub use stats::{BuddyStats, MemoryStatsReporter};
