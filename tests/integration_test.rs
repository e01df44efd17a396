//! Integration tests for the buddy arena crate
//!
//! Exercises the public allocator surface end to end: initialization,
//! split/coalesce sequences, invalid releases and the reports.

#![no_std]

extern crate alloc;
extern crate buddy_arena;

use alloc::vec::Vec;
use buddy_arena::{
    AllocError, BaseAllocator, BuddyArena, BuddyBlock, BuddyStats, ByteAllocator,
    LockedBuddyArena, MemoryStatsReporter,
};
use core::alloc::Layout;

const ARENA_SIZE: usize = 1024;
const FAKE_BASE: usize = 0x1000_0000;

/// Allocate test memory using system allocator
fn alloc_test_heap(size: usize) -> (*mut u8, Layout) {
    let layout = Layout::from_size_align(size, size).unwrap();
    let ptr = unsafe { alloc::alloc::alloc(layout) };
    assert!(!ptr.is_null(), "Failed to allocate test heap");
    (ptr, layout)
}

/// Deallocate test memory
fn dealloc_test_heap(ptr: *mut u8, layout: Layout) {
    unsafe { alloc::alloc::dealloc(ptr, layout) };
}

fn free_counts(stats: &BuddyStats) -> Vec<usize> {
    stats
        .orders()
        .map(|order| stats.free_blocks_by_order[order])
        .collect()
}

fn assert_conserved<const M: usize>(arena: &BuddyArena<M>) {
    let stats = arena.stats();
    let total: usize = stats
        .orders()
        .map(|o| (stats.free_blocks_by_order[o] + stats.used_blocks_by_order[o]) << o)
        .sum();
    assert_eq!(total, arena.capacity());
    assert_eq!(stats.used_bytes + stats.free_bytes, arena.capacity());
}

/// Check that allocated and free blocks are aligned, tile the arena exactly,
/// and that no two free buddies are left unmerged
fn assert_block_layout<const M: usize>(arena: &BuddyArena<M>) {
    let stats = arena.stats();
    let mut blocks: Vec<(BuddyBlock, bool)> = arena
        .allocations()
        .map(|(addr, block)| {
            assert_eq!(addr - arena.base(), block.offset);
            (block, false)
        })
        .collect();
    for order in stats.orders() {
        blocks.extend(arena.free_blocks_by_order(order).map(|b| (*b, true)));
    }

    for (block, free) in &blocks {
        assert!(block.is_naturally_aligned(), "misaligned {:?}", block);
        if *free && block.order < arena.max_order() {
            let buddy = block.buddy_offset();
            assert!(
                !arena
                    .free_blocks_by_order(block.order)
                    .any(|b| b.offset == buddy),
                "unmerged buddies at order {}: {:#x} and {:#x}",
                block.order,
                block.offset,
                buddy
            );
        }
    }

    blocks.sort_by_key(|(block, _)| block.offset);
    let mut cursor = 0;
    for (block, _) in &blocks {
        assert_eq!(block.offset, cursor, "gap or overlap at {:#x}", cursor);
        cursor += block.size();
    }
    assert_eq!(cursor, arena.capacity());
}

/// Small deterministic generator so the mixed workload is reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as usize
    }
}

#[test]
fn test_real_heap_arena() {
    let (heap_ptr, heap_layout) = alloc_test_heap(ARENA_SIZE);
    let heap_addr = heap_ptr as usize;

    let mut arena = BuddyArena::<0>::with_region(heap_addr, ARENA_SIZE).unwrap();

    let addr = arena.allocate(30).unwrap();
    assert!(addr >= heap_addr && addr + 32 <= heap_addr + ARENA_SIZE);

    // The block is real memory owned by the caller
    unsafe { core::ptr::write_bytes(addr as *mut u8, 0xAB, 30) };

    arena.release(addr).unwrap();
    dealloc_test_heap(heap_ptr, heap_layout);
}

#[test]
fn test_cascading_split_and_full_coalesce() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();
    let fresh = arena.stats();

    let addr = arena.allocate(30).unwrap();
    let stats = arena.stats();
    assert_eq!(stats.usage(), (32, 992));
    assert_eq!(
        free_counts(&stats),
        [0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0]
    );

    arena.release(addr).unwrap();
    assert_eq!(arena.stats(), fresh);
    assert_eq!(arena.stats().usage(), (0, 1024));
}

#[test]
fn test_roundtrip_every_size() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();
    let fresh = arena.stats();

    for size in 1..=ARENA_SIZE {
        let addr = arena.allocate(size).unwrap();
        let block = arena.block_size_of(addr).unwrap();
        assert!(block >= size && block < size * 2, "size {}", size);
        assert_conserved(&arena);

        arena.release(addr).unwrap();
        assert_eq!(arena.stats(), fresh, "size {}", size);
    }
}

#[test]
fn test_exhaustion_and_retry() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();

    assert_eq!(arena.allocate(ARENA_SIZE + 1), Err(AllocError::NoMemory));

    let whole = arena.allocate(ARENA_SIZE).unwrap();
    assert_eq!(arena.allocate(ARENA_SIZE), Err(AllocError::NoMemory));

    arena.release(whole).unwrap();
    assert!(arena.allocate(ARENA_SIZE).is_ok());
}

#[test]
fn test_fragmentation_blocks_large_request() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();

    // Fill the arena with 64-byte blocks
    let addrs: Vec<usize> = (0..16).map(|_| arena.allocate(64).unwrap()).collect();
    assert_eq!(arena.allocate(1), Err(AllocError::NoMemory));

    // Free every other block: half the arena is free but nothing merges
    for addr in addrs.iter().step_by(2) {
        arena.release(*addr).unwrap();
    }
    assert_eq!(arena.stats().usage(), (512, 512));
    assert_eq!(arena.stats().free_blocks_by_order[6], 8);
    assert_eq!(arena.allocate(128), Err(AllocError::NoMemory));
    assert!(arena.allocate(64).is_ok());
}

#[test]
fn test_coalesce_out_of_order() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();
    let fresh = arena.stats();

    let addrs: Vec<usize> = (0..8).map(|_| arena.allocate(100).unwrap()).collect();
    assert_eq!(arena.stats().usage(), (1024, 0));

    for idx in [5, 0, 7, 2, 4, 1, 6, 3] {
        arena.release(addrs[idx]).unwrap();
        assert_conserved(&arena);
    }
    assert_eq!(arena.stats(), fresh);
}

#[test]
fn test_buddy_merge_on_release() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();

    let a = arena.allocate(16).unwrap();
    let b = arena.allocate(16).unwrap();
    let offset_a = a - FAKE_BASE;
    let offset_b = b - FAKE_BASE;
    assert_eq!(offset_a ^ offset_b, 16);

    arena.release(b).unwrap();
    // b's buddy a is still allocated
    assert_eq!(arena.stats().free_blocks_by_order[4], 1);

    arena.release(a).unwrap();
    assert_eq!(arena.stats().free_blocks_by_order[4], 0);
    assert_eq!(arena.stats().free_blocks_by_order[10], 1);
}

#[test]
fn test_mixed_workload_conservation() {
    let mut arena = BuddyArena::<2>::with_region(FAKE_BASE, 1 << 16).unwrap();
    let fresh = arena.stats();
    let mut rng = Lcg(42);
    let mut live: Vec<usize> = Vec::new();

    for _ in 0..2000 {
        if live.is_empty() || rng.next() % 3 != 0 {
            let size = 1 + rng.next() % 2048;
            match arena.allocate(size) {
                Ok(addr) => live.push(addr),
                Err(e) => assert_eq!(e, AllocError::NoMemory),
            }
        } else {
            let idx = rng.next() % live.len();
            let addr = live.swap_remove(idx);
            arena.release(addr).unwrap();
        }
        assert_conserved(&arena);
    }

    for addr in live.drain(..) {
        arena.release(addr).unwrap();
    }
    assert_eq!(arena.stats(), fresh);
}

#[test]
fn test_mixed_workload_block_layout() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, 4096).unwrap();
    let mut rng = Lcg(7);
    let mut live: Vec<usize> = Vec::new();

    for _ in 0..3000 {
        if live.is_empty() || rng.next() % 2 == 0 {
            let size = 1 + rng.next() % 300;
            match arena.allocate(size) {
                Ok(addr) => live.push(addr),
                Err(e) => assert_eq!(e, AllocError::NoMemory),
            }
        } else {
            let idx = rng.next() % live.len();
            let addr = live.swap_remove(idx);
            arena.release(addr).unwrap();
        }
        assert_block_layout(&arena);
    }

    for addr in live.drain(..) {
        arena.release(addr).unwrap();
        assert_block_layout(&arena);
    }
    assert_eq!(arena.free_blocks_by_order(12).count(), 1);
}

#[test]
fn test_invalid_release_leaves_counts() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();
    let addr = arena.allocate(30).unwrap();
    let before = arena.stats();

    assert_eq!(arena.release(addr + 1), Err(AllocError::NotAllocated));
    assert_eq!(arena.release(0), Err(AllocError::NotAllocated));
    assert_eq!(arena.stats(), before);

    arena.release(addr).unwrap();
    let after = arena.stats();
    assert_eq!(arena.release(addr), Err(AllocError::NotAllocated));
    assert_eq!(arena.stats(), after);
}

#[test]
fn test_capacity_policy() {
    assert!(BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).is_ok());
    assert_eq!(
        BuddyArena::<0>::with_region(FAKE_BASE, 1000).err(),
        Some(AllocError::InvalidConfiguration)
    );

    let mut arena = BuddyArena::<0>::new();
    assert_eq!(
        BaseAllocator::init(&mut arena, FAKE_BASE, 0),
        Err(AllocError::InvalidConfiguration)
    );
    assert!(!arena.is_initialized());
}

#[test]
fn test_dump_after_allocations() {
    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();
    let addr = arena.allocate(30).unwrap();
    arena.allocate(200).unwrap();

    let dump = arena.dump();
    let lines: Vec<&str> = dump.lines().collect();

    // Header, column names, orders 0..=10, used header, two allocations
    assert_eq!(lines.len(), 2 + 11 + 1 + 2);
    assert_eq!(lines[2 + 5], " 5 |           32 |      1 |      1");
    assert_eq!(lines[2 + 8], " 8 |          256 |      0 |      1");
    assert_eq!(lines[2 + 10], "10 |         1024 |      0 |      0");
    assert_eq!(lines[13], "--- used ---");
    assert!(lines[14].ends_with(&alloc::format!("{:#x}", addr)));

    let summary = MemoryStatsReporter::summary(&arena.stats());
    assert!(summary.contains("Used Memory:  288 bytes (28.1%)"));
}

#[test]
fn test_byte_allocator_seam() {
    fn fill<A: ByteAllocator>(allocator: &mut A, size: usize) -> usize {
        let mut count = 0;
        while allocator.alloc(size).is_ok() {
            count += 1;
        }
        count
    }

    let mut arena = BuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();
    assert_eq!(fill(&mut arena, 100), 8);
    assert_eq!(arena.available_bytes(), 0);
    assert_eq!(arena.total_bytes(), ARENA_SIZE);
}

#[test]
fn test_locked_arena() {
    let arena = LockedBuddyArena::<0>::with_region(FAKE_BASE, ARENA_SIZE).unwrap();

    let a = arena.allocate(512).unwrap();
    let b = arena.allocate(512).unwrap();
    assert_eq!(arena.allocate(1), Err(AllocError::NoMemory));

    arena.release(a).unwrap();
    arena.release(b).unwrap();
    assert_eq!(arena.stats().usage(), (0, ARENA_SIZE));

    arena.init(FAKE_BASE, 2 * ARENA_SIZE).unwrap();
    assert_eq!(arena.stats().usage(), (0, 2 * ARENA_SIZE));
}
