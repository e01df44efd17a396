//! Node pool for the buddy free lists
//!
//! Provides a single pool of list nodes shared across all orders of an arena.
//! Nodes live in one growable slab and are addressed by index, so the free
//! lists never hold pointers into the arena they describe.

use alloc::vec::Vec;

use super::buddy_block::BuddyBlock;

/// Simple linked list node used by the node pool
#[derive(Debug, Clone, Copy)]
pub struct ListNode<T> {
    pub data: T,
    pub next: Option<usize>,
}

/// Node pool - all orders share nodes from this pool
///
/// Released nodes are threaded onto an internal free chain and handed out
/// again before the slab grows.
pub struct NodePool {
    nodes: Vec<ListNode<BuddyBlock>>,
    /// Free chain head - index of the first recycled node
    free_head: Option<usize>,
    /// Current number of recycled nodes in the pool
    free_nodes: usize,
    /// Allocation statistics
    total_allocations: usize,
    total_deallocations: usize,
}

impl NodePool {
    /// Create an empty node pool
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_head: None,
            free_nodes: 0,
            total_allocations: 0,
            total_deallocations: 0,
        }
    }

    /// Create a pool with room for `capacity` nodes before growing
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self::new();
        pool.reserve(capacity);
        pool
    }

    /// Drop every node and reset the statistics
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.free_head = None;
        self.free_nodes = 0;
        self.total_allocations = 0;
        self.total_deallocations = 0;
    }

    /// Make sure at least `additional` more nodes fit without reallocating
    pub fn reserve(&mut self, additional: usize) {
        self.nodes.reserve(additional.saturating_sub(self.free_nodes));
    }

    /// Allocate a node from the pool holding `data`
    ///
    /// Returns the index of the allocated node.
    pub fn alloc_node(&mut self, data: BuddyBlock) -> usize {
        self.total_allocations += 1;

        if let Some(idx) = self.free_head {
            let node = &mut self.nodes[idx];
            self.free_head = node.next;
            node.data = data;
            node.next = None;
            self.free_nodes -= 1;
            return idx;
        }

        self.nodes.push(ListNode { data, next: None });
        self.nodes.len() - 1
    }

    /// Deallocate a node back to the pool
    ///
    /// The node should not be part of any active list when freed
    pub fn dealloc_node(&mut self, node_idx: usize) {
        let Some(node) = self.nodes.get_mut(node_idx) else {
            return;
        };
        node.data = BuddyBlock::default();
        node.next = self.free_head;

        self.free_head = Some(node_idx);
        self.total_deallocations += 1;
        self.free_nodes += 1;
    }

    /// Get a reference to a node by index
    pub fn get_node(&self, node_idx: usize) -> Option<&ListNode<BuddyBlock>> {
        self.nodes.get(node_idx)
    }

    /// Get a mutable reference to a node by index
    pub fn get_node_mut(&mut self, node_idx: usize) -> Option<&mut ListNode<BuddyBlock>> {
        self.nodes.get_mut(node_idx)
    }

    /// Get the number of recycled nodes in the pool
    pub fn free_node_count(&self) -> usize {
        self.free_nodes
    }

    /// Get the number of nodes currently linked into lists
    pub fn allocated_node_count(&self) -> usize {
        self.nodes.len() - self.free_nodes
    }

    /// Get pool statistics
    pub fn get_stats(&self) -> NodePoolStats {
        NodePoolStats {
            total_nodes: self.nodes.len(),
            free_nodes: self.free_nodes,
            allocated_nodes: self.allocated_node_count(),
            total_allocations: self.total_allocations,
            total_deallocations: self.total_deallocations,
        }
    }
}

impl Default for NodePool {
    fn default() -> Self {
        Self::new()
    }
}

/// Node pool statistics
#[derive(Debug, Default, Clone)]
pub struct NodePoolStats {
    pub total_nodes: usize,
    pub free_nodes: usize,
    pub allocated_nodes: usize,
    pub total_allocations: usize,
    pub total_deallocations: usize,
}
