//! One self-play game driven by one search tree.
//!
//! An [`Actor`] never evaluates positions itself. Each simulation is split in
//! two around a batched network call:
//!
//! - [`Actor::before_nn_evaluation`] selects a leaf, replays the path on a copy
//!   of the game, and pushes the leaf's features into a [`BatchEvaluator`]
//! - [`Actor::after_nn_evaluation`] takes the network output for that slot,
//!   expands the leaf, and backs the value up
//!
//! [`Actor::think`] runs both halves in a loop for single-game use.

use engine_core::{resign_score, Action, Environment, Player, Rotation};
use mcts::{
    random, BatchEvaluator, Candidate, EvaluatorError, LeafEvaluation, MctsConfig, MctsTree,
    Network, NetworkOutput, NodeId, SearchError, SearchVariant,
};
use tracing::{debug, trace};

pub struct Actor<E: Environment> {
    env: E,
    tree: MctsTree,
    /// Batch slot of the leaf waiting for a network output
    pending: Option<usize>,
    /// Root-to-leaf path of the current simulation
    path: Vec<NodeId>,
    /// Position at the end of `path`
    leaf_env: Option<E>,
    search_action: Option<Action>,
    /// Search distribution of every move played so far
    comments: Vec<String>,
}

impl<E: Environment> Actor<E> {
    pub fn new(env: E, config: MctsConfig) -> Self {
        let tree = MctsTree::new(config, env.policy_size());
        Self {
            env,
            tree,
            pending: None,
            path: Vec::new(),
            leaf_env: None,
            search_action: None,
            comments: Vec::new(),
        }
    }

    /// Start a new game.
    pub fn reset(&mut self) {
        self.env.reset();
        self.comments.clear();
        self.reset_search();
    }

    /// Start a new search from the current position.
    pub fn reset_search(&mut self) {
        self.tree.reset();
        self.pending = None;
        self.path.clear();
        self.leaf_env = None;
        self.search_action = None;
    }

    /// Select a leaf and queue its features on `evaluator`.
    pub fn before_nn_evaluation<N: Network>(
        &mut self,
        evaluator: &BatchEvaluator<N>,
    ) -> Result<(), SearchError> {
        let path = self.tree.select();
        let mut leaf_env = self.env.clone();
        for &id in &path[1..] {
            let Some(action) = self.tree.get(id).action else {
                continue;
            };
            if !leaf_env.act(action) {
                return Err(SearchError::IllegalActionOnReplay { action });
            }
        }

        let slot = evaluator.push_back(leaf_env.features(Rotation::Identity));
        self.pending = Some(slot);
        self.path = path;
        self.leaf_env = Some(leaf_env);
        Ok(())
    }

    /// Consume the network output for the pending leaf.
    pub fn after_nn_evaluation(&mut self, output: &NetworkOutput) -> Result<(), SearchError> {
        self.pending.take().ok_or(SearchError::NoPendingEvaluation)?;
        let leaf_env = self
            .leaf_env
            .take()
            .ok_or(SearchError::NoPendingEvaluation)?;
        let leaf = *self.path.last().ok_or(SearchError::NoPendingEvaluation)?;

        if leaf_env.is_terminal() {
            let value = self
                .tree
                .config()
                .terminal_value(leaf_env.eval_score(false));
            self.tree.backup(&self.path, value);
        } else {
            let candidates = action_candidates(&leaf_env, output);
            self.tree.expand(leaf, &candidates)?;
            if self.tree.config().variant == SearchVariant::ProofCost {
                if let Some((value_n, value_m)) = output.expected_values() {
                    self.tree
                        .store_leaf_evaluation(leaf, LeafEvaluation { value_n, value_m });
                }
            }
            self.tree.backup(&self.path, output.value);

            if leaf == NodeId::ROOT && !self.tree.root().is_leaf() {
                random::with_rng(|rng| self.tree.add_root_noise(rng));
            }
        }

        trace!(
            depth = self.path.len() - 1,
            root_count = self.tree.root().count,
            "simulation"
        );

        if self.tree.is_search_done() {
            self.search_action = random::with_rng(|rng| self.tree.decide_action(rng));
            debug!(
                action = ?self.search_action,
                distribution = %self.tree.search_distribution(),
                stats = ?self.tree.stats(),
                "Search done"
            );
        }
        Ok(())
    }

    /// The root has received `num_simulation + 1` backups.
    pub fn is_search_done(&self) -> bool {
        self.tree.is_search_done()
    }

    /// Run a full search with `evaluator` and return the chosen action,
    /// playing it when `with_play` is set.
    pub fn think<N: Network>(
        &mut self,
        evaluator: &BatchEvaluator<N>,
        with_play: bool,
    ) -> Result<Action, SearchError> {
        self.reset_search();
        while !self.is_search_done() {
            self.before_nn_evaluation(evaluator)?;
            let slot = self.pending.ok_or(SearchError::NoPendingEvaluation)?;
            let outputs = evaluator.forward()?;
            let output = outputs.get(slot).ok_or(EvaluatorError::OutputMismatch {
                expected: slot + 1,
                actual: outputs.len(),
            })?;
            self.after_nn_evaluation(output)?;
        }

        let action = self.search_action.ok_or(SearchError::NoSearchAction)?;
        if with_play {
            self.act(action)?;
        }
        Ok(action)
    }

    /// Play `action` on the real game and record the search distribution
    /// that produced it.
    pub fn act(&mut self, action: Action) -> Result<(), SearchError> {
        if !self.env.act(action) {
            return Err(SearchError::IllegalAction { action });
        }
        self.comments.push(self.tree.search_distribution());
        Ok(())
    }

    /// Action chosen by the last finished search.
    pub fn search_action(&self) -> Option<Action> {
        self.search_action
    }

    /// The side to move should give up: its normalized root value is below
    /// the configured threshold.
    pub fn is_resign(&self) -> bool {
        let Some(threshold) = self.tree.config().resign_threshold else {
            return false;
        };
        if self.tree.root().count == 0 || self.tree.value_map().len() < 2 {
            return false;
        }
        let value = self.tree.normalized_mean(NodeId::ROOT);
        let value = match self.env.turn() {
            Player::P1 => value,
            Player::P2 => -value,
        };
        value < threshold
    }

    /// `"SelfPlay <moves> <record>"` for the game so far.
    pub fn record(&self, network_name: &str) -> String {
        let result = if self.env.is_terminal() {
            self.env.eval_score(false)
        } else {
            resign_score(self.env.turn())
        };
        let tags = [
            ("EV", network_name.to_string()),
            ("RE", result.to_string()),
        ];
        format!(
            "SelfPlay {} {}",
            self.env.action_history().len(),
            self.env.record(&self.comments, &tags)
        )
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    pub fn tree(&self) -> &MctsTree {
        &self.tree
    }

    pub fn pending_batch_index(&self) -> Option<usize> {
        self.pending
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }
}

/// Legal actions of `env` with their priors, highest prior first. Equal
/// priors keep id order.
fn action_candidates<E: Environment>(env: &E, output: &NetworkOutput) -> Vec<Candidate> {
    let turn = env.turn();
    let mut candidates: Vec<Candidate> = output
        .policy
        .iter()
        .enumerate()
        .map(|(id, &policy)| (Action::new(id, turn), policy))
        .filter(|&(action, _)| env.is_legal_action(action))
        .map(|(action, policy)| {
            let logit = output.policy_logits.get(action.id()).copied().unwrap_or(0.0);
            Candidate::new(action, policy, logit)
        })
        .collect();
    candidates.sort_by(|a, b| b.policy.total_cmp(&a.policy));
    candidates
}
