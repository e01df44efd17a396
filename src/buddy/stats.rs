//! Statistics and reporting for the buddy arena
//!
//! Provides a copyable statistics snapshot and the textual reports built
//! from it.

use alloc::string::String;
use core::fmt::Write;

#[cfg(feature = "log")]
use log::debug;

use super::buddy_block::{BuddyBlock, DEFAULT_MAX_ORDER};

/// Buddy arena statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyStats {
    pub total_bytes: usize,
    pub free_bytes: usize,
    pub used_bytes: usize,
    pub min_order: usize,
    pub max_order: usize,
    pub free_blocks_by_order: [usize; DEFAULT_MAX_ORDER + 1],
    pub used_blocks_by_order: [usize; DEFAULT_MAX_ORDER + 1],
}

impl Default for BuddyStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BuddyStats {
    pub const fn new() -> Self {
        Self {
            total_bytes: 0,
            free_bytes: 0,
            used_bytes: 0,
            min_order: 0,
            max_order: 0,
            free_blocks_by_order: [0; DEFAULT_MAX_ORDER + 1],
            used_blocks_by_order: [0; DEFAULT_MAX_ORDER + 1],
        }
    }

    /// `(used_bytes, free_bytes)`
    pub const fn usage(&self) -> (usize, usize) {
        (self.used_bytes, self.free_bytes)
    }

    /// Share of the arena that is allocated, in percent
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 * 100.0 / self.total_bytes as f64
    }

    /// Share of the arena that is free, in percent
    pub fn free_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.free_bytes as f64 * 100.0 / self.total_bytes as f64
    }

    /// Orders covered by the arena, smallest first
    ///
    /// Empty for a snapshot of an arena with no memory.
    #[allow(clippy::reversed_empty_ranges)]
    pub fn orders(&self) -> core::ops::RangeInclusive<usize> {
        if self.total_bytes == 0 {
            return 1..=0;
        }
        self.min_order..=self.max_order
    }
}

/// Textual reports over a [`BuddyStats`] snapshot
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Render the per-order table followed by the list of allocated blocks
    ///
    /// ```text
    /// --- memory ---
    /// n  |   block size |   free |   used
    ///  0 |            1 |      0 |      0
    /// ...
    /// --- used ---
    ///  5: 0x80000000
    /// ```
    pub fn dump<I>(stats: &BuddyStats, allocations: I) -> String
    where
        I: IntoIterator<Item = (usize, BuddyBlock)>,
    {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = Self::write_table(&mut out, stats);
        let _ = Self::write_used(&mut out, allocations);
        out
    }

    fn write_table(out: &mut String, stats: &BuddyStats) -> core::fmt::Result {
        writeln!(out, "--- memory ---")?;
        writeln!(
            out,
            "{:<2} | {:>12} | {:>6} | {:>6}",
            "n", "block size", "free", "used"
        )?;
        for order in stats.orders() {
            writeln!(
                out,
                "{:>2} | {:>12} | {:>6} | {:>6}",
                order,
                1usize << order,
                stats.free_blocks_by_order[order],
                stats.used_blocks_by_order[order]
            )?;
        }
        Ok(())
    }

    fn write_used<I>(out: &mut String, allocations: I) -> core::fmt::Result
    where
        I: IntoIterator<Item = (usize, BuddyBlock)>,
    {
        writeln!(out, "--- used ---")?;
        for (addr, block) in allocations {
            writeln!(out, "{:>2}: {:#x}", block.order, addr)?;
        }
        Ok(())
    }

    /// Render the usage summary
    pub fn summary(stats: &BuddyStats) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Total Memory: {} bytes", stats.total_bytes);
        let _ = writeln!(
            out,
            "Used Memory:  {} bytes ({:.1}%)",
            stats.used_bytes,
            stats.used_percent()
        );
        let _ = writeln!(
            out,
            "Free Memory:  {} bytes ({:.1}%)",
            stats.free_bytes,
            stats.free_percent()
        );
        out
    }

    /// Log why an allocation request could not be served
    #[allow(unused_variables)]
    pub fn log_alloc_failure(stats: &BuddyStats, request_size: usize, request_order: usize) {
        debug!("========================================");
        debug!(
            "Request: {} bytes (order {}, block {} bytes)",
            request_size,
            request_order,
            1usize << request_order.min(usize::BITS as usize - 1)
        );
        debug!(
            "  Free bytes: {} / {}",
            stats.free_bytes, stats.total_bytes
        );
        debug!("  Free blocks by order:");
        for order in stats.orders().rev() {
            let count = stats.free_blocks_by_order[order];
            if count > 0 {
                debug!(
                    "    Order {}: {} blocks ({} bytes each)",
                    order,
                    count,
                    1usize << order
                );
            }
        }
        debug!("========================================");
    }
}
