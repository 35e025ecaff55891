//! MCTS tree: PUCT selection, expansion, backup, and root action choice.
//!
//! The tree owns its node arena, the proof-cost side data, and the value map
//! that holds the mean of every visited node. Values are stored from P1's
//! perspective; the sign is flipped per edge mover when scoring children.

use engine_core::{Action, Player};
use rand::Rng;
use tracing::trace;

use crate::arena::{ExtraDataSlab, NodeArena};
use crate::config::{ActionSelection, MctsConfig, SearchVariant};
use crate::error::SearchError;
use crate::node::{NodeId, TreeNode};
use crate::noise::apply_root_noise;
use crate::random::sample_uniform_real;
use crate::value_map::ValueMap;

/// Proof-cost added for each P1 edge on a backed-up path: `log10(50)`.
pub const PROOF_COST_STEP: f32 = 1.698_970_004;

/// One child to install during expansion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub action: Action,
    pub policy: f32,
    pub policy_logit: f32,
}

impl Candidate {
    pub fn new(action: Action, policy: f32, policy_logit: f32) -> Self {
        Self {
            action,
            policy,
            policy_logit,
        }
    }
}

/// Expected proof-cost heads kept for each expanded leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafEvaluation {
    pub value_n: f32,
    pub value_m: f32,
}

/// MCTS tree with arena-based node storage.
#[derive(Debug, Clone)]
pub struct MctsTree {
    config: MctsConfig,
    arena: NodeArena,
    extra: ExtraDataSlab<LeafEvaluation>,
    value_map: ValueMap,
}

impl MctsTree {
    /// Create a tree sized so a full search over `action_size` actions never
    /// exhausts the arena.
    pub fn new(config: MctsConfig, action_size: usize) -> Self {
        let capacity = config.tree_capacity(action_size);
        Self::with_capacity(config, capacity)
    }

    pub fn with_capacity(config: MctsConfig, capacity: usize) -> Self {
        let extra = ExtraDataSlab::with_capacity(config.num_simulation as usize + 1);
        Self {
            config,
            arena: NodeArena::with_capacity(capacity),
            extra,
            value_map: ValueMap::new(),
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Discard the whole tree, leaving a fresh root.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.extra.reset();
        self.value_map.clear();
    }

    #[inline]
    pub fn root(&self) -> &TreeNode {
        self.arena.root()
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &TreeNode {
        self.arena.get(id)
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn value_map(&self) -> &ValueMap {
        &self.value_map
    }

    /// Proof-cost heads stored for `id` at expansion time.
    pub fn leaf_evaluation(&self, id: NodeId) -> Option<&LeafEvaluation> {
        self.get(id).extra_data.and_then(|index| self.extra.get(index))
    }

    /// Attach proof-cost heads to `id`.
    pub fn store_leaf_evaluation(&mut self, id: NodeId, evaluation: LeafEvaluation) {
        let index = self.extra.store(evaluation);
        self.arena.get_mut(id).extra_data = Some(index);
    }

    /// Mean of `id` rescaled into `[-1, 1]` against the value map, from P1's
    /// perspective. Unvisited nodes are -1.
    pub fn normalized_mean(&self, id: NodeId) -> f32 {
        let node = self.get(id);
        if node.count == 0 {
            return -1.0;
        }
        self.value_map.normalize(node.mean)
    }

    /// Normalized mean from the perspective of the player who moved into
    /// `id`.
    fn mover_value(&self, id: NodeId) -> f32 {
        let value = self.normalized_mean(id);
        match self.get(id).action.map(|a| a.player()) {
            Some(Player::P2) => -value,
            _ => value,
        }
    }

    /// Q-value for unvisited children: the average over visited children
    /// plus one loss.
    pub fn init_q_value(&self, parent: NodeId) -> f32 {
        let (sum, visited) = self
            .get(parent)
            .children()
            .filter(|&child| self.get(child).count > 0)
            .fold((0.0f32, 0u32), |(sum, n), child| {
                (sum + self.mover_value(child), n + 1)
            });
        (sum - 1.0) / (visited as f32 + 1.0)
    }

    /// PUCT score of `child` under `parent`.
    pub fn puct_score(&self, parent: NodeId, child: NodeId, init_q: f32) -> f32 {
        let total = self.get(parent).count as f32;
        let node = self.get(child);
        let puct_bias = self.config.puct_init
            + ((1.0 + total + self.config.puct_base) / self.config.puct_base).ln();
        let value_u = puct_bias * node.policy * total.sqrt() / (1.0 + node.count as f32);
        let value_q = if node.count == 0 {
            init_q
        } else {
            self.mover_value(child)
        };
        value_u + value_q
    }

    /// Highest-PUCT child; ties go to the earliest child.
    fn select_child_by_puct(&self, parent: NodeId) -> NodeId {
        let init_q = self.init_q_value(parent);
        let children = self.get(parent).children();
        let mut best = children.clone().next().unwrap_or(NodeId::NONE);
        let mut best_score = f32::NEG_INFINITY;
        for child in children {
            let score = self.puct_score(parent, child, init_q);
            if score > best_score {
                best_score = score;
                best = child;
            }
        }
        best
    }

    /// Walk from the root to a leaf by PUCT. The path starts with the root.
    pub fn select(&self) -> Vec<NodeId> {
        let mut node = NodeId::ROOT;
        let mut path = vec![node];
        while !self.get(node).is_leaf() {
            node = self.select_child_by_puct(node);
            path.push(node);
        }
        path
    }

    /// Install `candidates` as the children of `leaf`, in the given order.
    pub fn expand(&mut self, leaf: NodeId, candidates: &[Candidate]) -> Result<(), SearchError> {
        if candidates.is_empty() {
            return Err(SearchError::NoLegalActions);
        }

        let first = self.arena.allocate_children(candidates.len())?;
        for (offset, candidate) in candidates.iter().enumerate() {
            let child = self.arena.get_mut(NodeId(first.0 + offset as u32));
            child.action = Some(candidate.action);
            child.player = candidate.action.next_player();
            child.policy = candidate.policy;
            child.policy_logit = candidate.policy_logit;
        }

        let node = self.arena.get_mut(leaf);
        node.first_child = first;
        node.num_children = candidates.len() as u32;
        Ok(())
    }

    /// Back `value` up along `path`, keeping the value map in sync with the
    /// means of visited nodes.
    pub fn backup(&mut self, path: &[NodeId], value: f32) {
        let Some(&leaf) = path.last() else {
            return;
        };

        let root_value = match self.config.variant {
            SearchVariant::AlphaZero => value,
            SearchVariant::ProofCost => {
                let p1_edges = path[1..]
                    .iter()
                    .filter(|&&id| self.get(id).action.map(|a| a.player()) == Some(Player::P1))
                    .count();
                let max_value = self.config.value_size.saturating_sub(1) as f32;
                (value + PROOF_COST_STEP * p1_edges as f32).clamp(0.0, max_value)
            }
        };

        self.arena.get_mut(leaf).value = value;
        for &id in path.iter().rev() {
            let node = self.arena.get_mut(id);
            if node.count > 0 {
                self.value_map.decrement(node.mean);
            }
            node.add(root_value);
            self.value_map.insert(node.mean);
        }

        trace!(depth = path.len() - 1, value, root_value, "backup");
    }

    /// Apply the configured root noise to the root's children.
    pub fn add_root_noise<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        apply_root_noise(&mut self.arena, NodeId::ROOT, self.config.root_noise, rng);
    }

    /// Most visited child of `node`; ties go to the first child. `None` if
    /// no child has been visited.
    pub fn select_child_by_max_count(&self, node: NodeId) -> Option<NodeId> {
        let mut max_count = 0;
        let mut selected = None;
        for child in self.get(node).children() {
            let count = self.get(child).count;
            if count <= max_count {
                continue;
            }
            max_count = count;
            selected = Some(child);
        }
        selected
    }

    /// Sample a child with probability proportional to `count^(1/temperature)`
    /// among children whose normalized mean is within `value_threshold` of the
    /// most visited child's.
    ///
    /// Single pass: the running sum grows before each draw, so the first
    /// eligible child is always taken and each later child replaces the
    /// current pick with probability `w / sum`.
    pub fn select_child_by_softmax_count<R: Rng + ?Sized>(
        &self,
        node: NodeId,
        temperature: f32,
        value_threshold: f32,
        rng: &mut R,
    ) -> Option<NodeId> {
        let best = self.select_child_by_max_count(node)?;
        let best_mean = self.normalized_mean(best);

        let mut selected = None;
        let mut sum = 0.0f32;
        for child in self.get(node).children() {
            let weight = (self.get(child).count as f32).powf(1.0 / temperature);
            if weight == 0.0 || (best_mean - self.normalized_mean(child)).abs() > value_threshold {
                continue;
            }
            sum += weight;
            if sample_uniform_real(rng, sum) < weight {
                selected = Some(child);
            }
        }
        selected
    }

    /// Root action according to the configured selection rule.
    pub fn decide_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Action> {
        let child = match self.config.action_selection {
            ActionSelection::ByCount => self.select_child_by_max_count(NodeId::ROOT),
            ActionSelection::BySoftmaxCount { temperature } => self.select_child_by_softmax_count(
                NodeId::ROOT,
                temperature,
                self.config.value_threshold,
                rng,
            ),
        }?;
        self.get(child).action
    }

    /// The root has received `num_simulation + 1` backups.
    pub fn is_search_done(&self) -> bool {
        self.root().count == self.config.num_simulation + 1
    }

    /// Visited root children as `"id:count,id:count"`.
    pub fn search_distribution(&self) -> String {
        self.root()
            .children()
            .map(|id| self.get(id))
            .filter(|child| child.count > 0)
            .filter_map(|child| child.action_id().map(|a| format!("{}:{}", a, child.count)))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            total_nodes: self.arena.len(),
            root_visits: self.root().count,
            root_value: self.normalized_mean(NodeId::ROOT),
            max_depth: self.max_depth(),
        }
    }

    fn max_depth(&self) -> u32 {
        let mut max_depth = 0;
        let mut stack = vec![(NodeId::ROOT, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(self.get(id).children().map(|child| (child, depth + 1)));
        }
        max_depth
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f32,
    pub max_depth: u32,
}
