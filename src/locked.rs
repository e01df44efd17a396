//! Lock-protected buddy arena
//!
//! Wraps a [`BuddyArena`] in a single spin lock so one arena can be shared
//! between callers. Split and coalesce touch both the free lists and the
//! block directory, so every operation runs under the same lock.

use alloc::string::String;
use alloc::vec::Vec;

use kspin::SpinNoIrq;

use crate::buddy::{BuddyArena, BuddyStats, MemoryStatsReporter};
use crate::AllocResult;

/// A buddy arena guarded by a spin lock
pub struct LockedBuddyArena<const MIN_ORDER: usize = 0> {
    inner: SpinNoIrq<BuddyArena<MIN_ORDER>>,
}

impl<const MIN_ORDER: usize> LockedBuddyArena<MIN_ORDER> {
    pub const fn new() -> Self {
        Self {
            inner: SpinNoIrq::new(BuddyArena::new()),
        }
    }

    /// Create a locked arena over `[base, base + capacity)`
    pub fn with_region(base: usize, capacity: usize) -> AllocResult<Self> {
        Ok(Self {
            inner: SpinNoIrq::new(BuddyArena::with_region(base, capacity)?),
        })
    }

    /// Initialize (or reset) the arena
    pub fn init(&self, base: usize, capacity: usize) -> AllocResult {
        self.inner.lock().init(base, capacity)
    }

    pub fn allocate(&self, size: usize) -> AllocResult<usize> {
        self.inner.lock().allocate(size)
    }

    pub fn release(&self, addr: usize) -> AllocResult {
        self.inner.lock().release(addr)
    }

    /// Snapshot of the arena usage, taken under the lock
    pub fn stats(&self) -> BuddyStats {
        self.inner.lock().stats()
    }

    /// Textual dump; the lock is only held while taking the snapshot
    pub fn dump(&self) -> String {
        let (stats, allocations) = {
            let arena = self.inner.lock();
            let allocations: Vec<_> = arena.allocations().collect();
            (arena.stats(), allocations)
        };
        MemoryStatsReporter::dump(&stats, allocations)
    }

    /// Run `f` with exclusive access to the arena
    pub fn with_arena<R>(&self, f: impl FnOnce(&mut BuddyArena<MIN_ORDER>) -> R) -> R {
        f(&mut *self.inner.lock())
    }
}

impl<const MIN_ORDER: usize> Default for LockedBuddyArena<MIN_ORDER> {
    fn default() -> Self {
        Self::new()
    }
}
