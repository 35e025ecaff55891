//! Pre-allocated node storage.
//!
//! The arena holds a fixed number of nodes and a stack pointer. Node 0 is
//! always the root. Children are carved off the top of the stack in contiguous
//! blocks, and the whole tree is discarded at once by [`NodeArena::reset`].
//! Nothing is allocated after construction.

use crate::error::SearchError;
use crate::node::{NodeId, TreeNode};

#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<TreeNode>,
    used: usize,
}

impl NodeArena {
    /// Create an arena of `capacity` nodes (at least one, for the root).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            nodes: vec![TreeNode::default(); capacity],
            used: 1,
        }
    }

    /// Reserve `n` contiguous, freshly reset nodes and return the first id.
    pub fn allocate_children(&mut self, n: usize) -> Result<NodeId, SearchError> {
        let capacity = self.nodes.len();
        if n > capacity - self.used {
            return Err(SearchError::ArenaExhausted {
                requested: n,
                used: self.used,
                capacity,
            });
        }

        let first = self.used;
        for node in &mut self.nodes[first..first + n] {
            node.reset();
        }
        self.used += n;
        Ok(NodeId(first as u32))
    }

    /// Discard every node except a freshly reset root.
    pub fn reset(&mut self) {
        self.used = 1;
        self.nodes[0].reset();
    }

    #[inline]
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &TreeNode {
        debug_assert!(id.index() < self.used, "node {} not allocated", id.0);
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        debug_assert!(id.index() < self.used, "node {} not allocated", id.0);
        &mut self.nodes[id.index()]
    }

    /// Allocated nodes, root included.
    pub fn len(&self) -> usize {
        self.used
    }

    /// Never true: the root is always allocated.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Allocated nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes[..self.used]
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }
}

/// Append-only side storage addressed by `TreeNode::extra_data`.
///
/// Reset together with the arena; stored values are dropped at that point.
#[derive(Debug, Clone)]
pub struct ExtraDataSlab<T> {
    items: Vec<T>,
}

impl<T> ExtraDataSlab<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Store `value` and return its index.
    pub fn store(&mut self, value: T) -> usize {
        self.items.push(value);
        self.items.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ExtraDataSlab<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_contiguous_blocks() {
        let mut arena = NodeArena::with_capacity(10);
        assert_eq!(arena.len(), 1);

        let a = arena.allocate_children(3).unwrap();
        let b = arena.allocate_children(4).unwrap();
        assert_eq!(a, NodeId(1));
        assert_eq!(b, NodeId(4));
        assert_eq!(arena.len(), 8);
    }

    #[test]
    fn test_allocation_fails_past_capacity() {
        let mut arena = NodeArena::with_capacity(5);
        arena.allocate_children(4).unwrap();
        match arena.allocate_children(1) {
            Err(SearchError::ArenaExhausted {
                requested,
                used,
                capacity,
            }) => {
                assert_eq!((requested, used, capacity), (1, 5, 5));
            }
            other => panic!("expected ArenaExhausted, got {other:?}"),
        }
        // A zero-sized request still succeeds on a full arena.
        assert!(arena.allocate_children(0).is_ok());
    }

    #[test]
    fn test_reset_rewinds_and_clears_reused_nodes() {
        let mut arena = NodeArena::with_capacity(4);
        let first = arena.allocate_children(3).unwrap();
        arena.get_mut(first).add(5.0);
        arena.get_mut(NodeId::ROOT).add(5.0);

        arena.reset();
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.root().count, 0);

        let again = arena.allocate_children(3).unwrap();
        assert_eq!(again, first);
        assert_eq!(arena.get(again).count, 0);
        assert_eq!(arena.get(again).mean, 0.0);
    }

    #[test]
    fn test_iter_covers_allocated_nodes_only() {
        let mut arena = NodeArena::with_capacity(16);
        arena.allocate_children(2).unwrap();
        let ids: Vec<NodeId> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2)]);
        assert_eq!(arena.capacity(), 16);
    }

    #[test]
    fn test_extra_data_slab() {
        let mut slab = ExtraDataSlab::with_capacity(2);
        let a = slab.store("a");
        let b = slab.store("b");
        assert_eq!((a, b), (0, 1));
        assert_eq!(slab.get(1), Some(&"b"));
        assert_eq!(slab.get(2), None);

        slab.reset();
        assert!(slab.is_empty());
        assert_eq!(slab.store("c"), 0);
    }
}
