//! MCTS configuration parameters.

/// How the move is chosen from the root once the search is done.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionSelection {
    /// Most visited child; ties go to the first child.
    ByCount,
    /// Sample proportional to `count^(1/temperature)` among children whose
    /// normalized value is close to the most visited child's.
    BySoftmaxCount { temperature: f32 },
}

/// Exploration noise applied once to the root's children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootNoise {
    None,
    /// Mix `epsilon` of a Dirichlet(`alpha`) sample into the priors.
    Dirichlet { alpha: f32, epsilon: f32 },
    /// Add standard Gumbel noise to the policy logits.
    Gumbel,
}

/// Backup rule and value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVariant {
    /// Values are game outcomes in `[-1, 1]` from P1's perspective.
    AlphaZero,
    /// Values are proof-cost bins in `[0, value_size - 1]`; every P1 edge on
    /// a path adds `log10(50)`.
    ProofCost,
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Number of simulations to run per move.
    pub num_simulation: u32,

    /// PUCT schedule: `C(N) = puct_init + ln((1 + N + puct_base) / puct_base)`.
    /// AlphaZero uses 1.25 and 19652.
    pub puct_init: f32,
    pub puct_base: f32,

    pub action_selection: ActionSelection,

    pub root_noise: RootNoise,

    pub variant: SearchVariant,

    /// Number of value bins (V) produced by a proof-cost network.
    pub value_size: u32,

    /// Softmax-count sampling ignores children whose normalized mean is
    /// further than this from the most visited child's.
    pub value_threshold: f32,

    /// Resign when the root's normalized value for the side to move falls
    /// below this. `None` disables resignation.
    pub resign_threshold: Option<f32>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulation: 50,
            puct_init: 1.25,
            puct_base: 19652.0,
            action_selection: ActionSelection::BySoftmaxCount { temperature: 1.0 },
            root_noise: RootNoise::Dirichlet {
                alpha: 0.03,
                epsilon: 0.25,
            },
            variant: SearchVariant::AlphaZero,
            value_size: 200,
            value_threshold: 0.1,
            resign_threshold: None,
        }
    }
}

impl MctsConfig {
    /// Create config for self-play (with exploration noise).
    pub fn for_self_play() -> Self {
        Self::default()
    }

    /// Create a deterministic config for testing: no noise, argmax selection.
    pub fn for_testing() -> Self {
        Self {
            num_simulation: 50,
            action_selection: ActionSelection::ByCount,
            root_noise: RootNoise::None,
            ..Self::default()
        }
    }

    /// Builder pattern: set number of simulations.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulation = n;
        self
    }

    /// Builder pattern: set the PUCT constants.
    pub fn with_puct(mut self, init: f32, base: f32) -> Self {
        self.puct_init = init;
        self.puct_base = base;
        self
    }

    pub fn with_action_selection(mut self, selection: ActionSelection) -> Self {
        self.action_selection = selection;
        self
    }

    pub fn with_root_noise(mut self, noise: RootNoise) -> Self {
        self.root_noise = noise;
        self
    }

    /// Builder pattern: switch to proof-cost backup with `value_size` bins.
    pub fn with_proof_cost(mut self, value_size: u32) -> Self {
        self.variant = SearchVariant::ProofCost;
        self.value_size = value_size;
        self
    }

    pub fn with_resign_threshold(mut self, threshold: Option<f32>) -> Self {
        self.resign_threshold = threshold;
        self
    }

    /// Arena size that guarantees a full search never runs out of nodes.
    pub fn tree_capacity(&self, action_size: usize) -> usize {
        (self.num_simulation as usize + 1) * action_size + 1
    }

    /// Value backed up for a terminal leaf with outcome `eval_score`.
    pub fn terminal_value(&self, eval_score: f32) -> f32 {
        match self.variant {
            SearchVariant::AlphaZero => eval_score,
            SearchVariant::ProofCost => {
                if eval_score == 1.0 {
                    self.value_size as f32 - 1.0
                } else {
                    0.0
                }
            }
        }
    }
}
