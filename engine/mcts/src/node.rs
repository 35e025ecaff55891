//! MCTS tree node representation.
//!
//! Each node is the edge reached by playing `action` from its parent. Nodes
//! live in the [`crate::arena::NodeArena`] and reference their children as a
//! contiguous id range, so a node never owns heap data.

use std::fmt;
use std::ops::Range;

use engine_core::{Action, Player};

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);
    pub const ROOT: NodeId = NodeId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Proof status of a node. Only assigned by the proof-cost solver; plain
/// searches leave every node `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverTag {
    #[default]
    Unknown,
    Win,
    Draw,
    Loss,
}

impl fmt::Display for SolverTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolverTag::Unknown => "UNKNOWN",
            SolverTag::Win => "WIN",
            SolverTag::Draw => "DRAW",
            SolverTag::Loss => "LOSS",
        };
        f.write_str(s)
    }
}

/// A node in the MCTS tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Edge action leading into this node (`None` for the root)
    pub action: Option<Action>,

    /// Player to move at this node
    pub player: Player,

    /// Number of backups through this node
    pub count: u32,

    /// Running mean of backed-up values
    pub mean: f32,

    /// Prior probability from the policy network (after root noise)
    pub policy: f32,

    /// Raw policy logit (after Gumbel noise)
    pub policy_logit: f32,

    /// Noise sample applied at the root, 0 elsewhere
    pub policy_noise: f32,

    /// Raw leaf value from the last backup that ended here
    pub value: f32,

    /// First child id, or `NodeId::NONE` for a leaf
    pub first_child: NodeId,

    pub num_children: u32,

    pub solver_tag: SolverTag,

    /// Action id proven to lose no worse than the best child
    pub equal_loss: Option<usize>,

    /// Index into the tree's extra-data slab
    pub extra_data: Option<usize>,
}

impl Default for TreeNode {
    fn default() -> Self {
        Self {
            action: None,
            player: Player::P1,
            count: 0,
            mean: 0.0,
            policy: 0.0,
            policy_logit: 0.0,
            policy_noise: 0.0,
            value: 0.0,
            first_child: NodeId::NONE,
            num_children: 0,
            solver_tag: SolverTag::Unknown,
            equal_loss: None,
            extra_data: None,
        }
    }
}

impl TreeNode {
    /// Clear all statistics and links.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one backup of `value`.
    #[inline]
    pub fn add(&mut self, value: f32) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f32;
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.num_children == 0
    }

    /// Ids of this node's children, in expansion order.
    #[inline]
    pub fn children(&self) -> impl Iterator<Item = NodeId> + Clone {
        self.child_range().map(NodeId)
    }

    /// Arena index range of this node's children.
    pub fn child_range(&self) -> Range<u32> {
        if self.first_child.is_none() {
            return 0..0;
        }
        self.first_child.0..self.first_child.0 + self.num_children
    }

    /// The `i`-th child, if any.
    pub fn child(&self, i: u32) -> Option<NodeId> {
        (i < self.num_children).then(|| NodeId(self.first_child.0 + i))
    }

    /// Id of the edge action, if this is not the root.
    pub fn action_id(&self) -> Option<usize> {
        self.action.map(|a| a.id())
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Some(action) => write!(f, "{}: ", action)?,
            None => write!(f, "root: ")?,
        }
        write!(
            f,
            "p = {:.6}, p_logit = {:.6}, p_noise = {:.6}, v = {:.6}, mean = {:.6}, count = {}, solver = {}",
            self.policy,
            self.policy_logit,
            self.policy_noise,
            self.value,
            self.mean,
            self.count,
            self.solver_tag
        )?;
        if let Some(id) = self.equal_loss {
            write!(f, ", equal_loss = {}", id)?;
        }
        if let Some(index) = self.extra_data {
            write!(f, ", extra_data = {}", index)?;
        }
        Ok(())
    }
}
