//! Pooled linked list implementation using the arena node pool
//!
//! Provides the per-order free lists. Each list keeps only its head and
//! length, while the nodes themselves are drawn from a shared [`NodePool`].

#[cfg(feature = "log")]
use log::error;

use super::{buddy_block::BuddyBlock, node_pool::NodePool};

/// Pooled linked list - uses nodes from the shared pool
///
/// Blocks are kept in ascending offset order, so the lowest free block of an
/// order is always handed out first.
pub struct PooledLinkedList {
    head: Option<usize>,
    len: usize,
}

impl PooledLinkedList {
    /// Create a new empty pooled linked list
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Insert element in sorted order (ascending by offset)
    ///
    /// Returns `false` and leaves the list untouched if a block with the same
    /// offset is already present.
    pub fn insert_sorted(&mut self, pool: &mut NodePool, data: BuddyBlock) -> bool {
        // Find insertion position
        let mut prev_idx = None;
        let mut current_idx = self.head;
        let mut visited = 0;

        while let Some(idx) = current_idx {
            if visited > self.len {
                error!("Potential cycle detected during insert");
                return false;
            }

            let Some(node) = pool.get_node(idx) else {
                error!("Invalid node reference {} in list", idx);
                return false;
            };
            if node.data.offset == data.offset {
                error!(
                    "Block at offset {:#x} (order {}) is already free",
                    data.offset, data.order
                );
                return false;
            }
            if node.data.offset > data.offset {
                break; // Found position
            }
            prev_idx = current_idx;
            current_idx = node.next;
            visited += 1;
        }

        let new_node_idx = pool.alloc_node(data);
        if let Some(node) = pool.get_node_mut(new_node_idx) {
            node.next = current_idx;
        }

        // Update links
        match prev_idx.and_then(|prev| pool.get_node_mut(prev)) {
            Some(prev_node) => prev_node.next = Some(new_node_idx),
            None => self.head = Some(new_node_idx),
        }

        self.len += 1;
        true
    }

    /// Pop an element from the front of the list
    pub fn pop_front(&mut self, pool: &mut NodePool) -> Option<BuddyBlock> {
        let head_idx = self.head?;

        let Some(head_node) = pool.get_node(head_idx) else {
            error!("Head node {} is corrupted", head_idx);
            return None;
        };
        let data = head_node.data;
        self.head = head_node.next;

        // Return node to pool
        pool.dealloc_node(head_idx);
        self.len -= 1;

        Some(data)
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the length of the list
    pub fn len(&self) -> usize {
        self.len
    }

    /// Find a node by offset (for buddy lookups)
    ///
    /// Returns (node_idx, prev_idx) where prev_idx is the node before it (or None if head)
    pub fn find_by_offset(&self, pool: &NodePool, offset: usize) -> Option<(usize, Option<usize>)> {
        let mut prev_idx = None;
        let mut current_idx = self.head;
        let mut visited = 0;

        while let Some(idx) = current_idx {
            if visited > self.len {
                error!("Potential cycle detected during search");
                return None;
            }

            let node = pool.get_node(idx)?;
            // Early termination: list is sorted by offset
            if node.data.offset > offset {
                break;
            }
            if node.data.offset == offset {
                return Some((idx, prev_idx));
            }
            prev_idx = current_idx;
            current_idx = node.next;
            visited += 1;
        }

        None
    }

    /// Remove the block at `offset`, returning it if it was present
    pub fn remove_by_offset(&mut self, pool: &mut NodePool, offset: usize) -> Option<BuddyBlock> {
        let (node_idx, prev_idx) = self.find_by_offset(pool, offset)?;
        self.remove_with_prev(pool, node_idx, prev_idx)
    }

    /// Remove a node using known prev_idx (O(1) operation)
    ///
    /// This is used when we already know the previous node index from
    /// find_by_offset(), avoiding a second traversal of the list.
    pub fn remove_with_prev(
        &mut self,
        pool: &mut NodePool,
        node_idx: usize,
        prev_idx: Option<usize>,
    ) -> Option<BuddyBlock> {
        let node = pool.get_node(node_idx)?;
        let (data, next_idx) = (node.data, node.next);

        // Verify prev_idx leads to node_idx if provided
        match prev_idx {
            Some(prev) => {
                let prev_node = pool.get_node_mut(prev)?;
                if prev_node.next != Some(node_idx) {
                    error!("prev_idx {} does not point to node_idx {}", prev, node_idx);
                    return None;
                }
                prev_node.next = next_idx;
            }
            None => {
                if self.head != Some(node_idx) {
                    error!("prev_idx is None but node_idx {} is not head", node_idx);
                    return None;
                }
                self.head = next_idx;
            }
        }

        // Return node to pool
        pool.dealloc_node(node_idx);
        self.len -= 1;
        Some(data)
    }

    /// Get iterator over elements
    pub fn iter<'a>(&'a self, pool: &'a NodePool) -> PooledListIter<'a> {
        PooledListIter {
            pool,
            current: self.head,
        }
    }

    /// Clear all nodes from the list
    ///
    /// Returns all nodes to the pool
    pub fn clear(&mut self, pool: &mut NodePool) {
        while self.pop_front(pool).is_some() {}
    }
}

impl Default for PooledLinkedList {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator for PooledLinkedList
pub struct PooledListIter<'a> {
    pool: &'a NodePool,
    current: Option<usize>,
}

impl<'a> Iterator for PooledListIter<'a> {
    type Item = &'a BuddyBlock;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current?;
        match self.pool.get_node(idx) {
            Some(node) => {
                self.current = node.next;
                Some(&node.data)
            }
            None => {
                self.current = None;
                None
            }
        }
    }
}
