//! Fixed-arena buddy allocator
//!
//! This crate partitions a single contiguous byte range into power-of-two
//! blocks and serves byte requests from it, featuring:
//! - Top-down splitting from the smallest sufficient free block
//! - Buddy coalescing on release, back up to the whole arena
//! - A block directory that rejects double frees and foreign addresses
//! - Per-order statistics and a textual dump of the free-list table
//!
//! The allocator only does bookkeeping: it never reads or writes the arena
//! memory itself, so the base address is an opaque handle.

#![no_std]

extern crate alloc;

use core::fmt;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Arena capacity is zero, not a power of two, below the minimum block
    /// size, above the supported maximum, or overflows the address space.
    InvalidConfiguration,
    /// Invalid request (e.g. zero size).
    InvalidParam,
    /// No free block large enough to satisfy the request.
    NoMemory,
    /// Release of an address that is not a currently allocated block.
    NotAllocated,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidConfiguration => "invalid arena configuration",
            Self::InvalidParam => "invalid allocation parameter",
            Self::NoMemory => "no free block large enough",
            Self::NotAllocated => "address is not an allocated block",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for AllocError {}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// The base allocator inherited by other allocators.
pub trait BaseAllocator {
    /// Initialize (or reset) the allocator over the memory region
    /// `[start, start + size)`, discarding all outstanding allocations.
    fn init(&mut self, start: usize, size: usize) -> AllocResult;
}

/// Byte-granularity allocator.
pub trait ByteAllocator: BaseAllocator {
    /// Allocate at least `size` bytes and return the block address.
    fn alloc(&mut self, size: usize) -> AllocResult<usize>;

    /// Release the block previously returned by [`ByteAllocator::alloc`].
    fn dealloc(&mut self, pos: usize) -> AllocResult;

    /// Returns total memory size in bytes.
    fn total_bytes(&self) -> usize;

    /// Returns allocated memory size in bytes.
    fn used_bytes(&self) -> usize;

    /// Returns available memory size in bytes.
    fn available_bytes(&self) -> usize;
}

/// Checks whether the address has the demanded alignment.
///
/// Equivalent to `addr % align == 0`, but the alignment must be a power of two.
#[inline]
const fn is_aligned(base_addr: usize, align: usize) -> bool {
    base_addr & (align - 1) == 0
}

pub mod buddy;
pub use buddy::{
    BuddyArena, BuddyBlock, BuddyStats, MemoryStatsReporter, DEFAULT_MAX_ORDER,
};

pub mod locked;
pub use locked::LockedBuddyArena;
