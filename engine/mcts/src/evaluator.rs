//! Network interface and the batch accumulator in front of it.
//!
//! A [`Network`] maps a batch of feature vectors to policy and value outputs.
//! In self-play this is a neural network on a device; for testing we provide
//! a uniform network. [`BatchEvaluator`] is the facade the actors talk to:
//! many threads [`push_back`](BatchEvaluator::push_back) features, then one
//! thread calls [`forward`](BatchEvaluator::forward) and the outputs come back
//! in slot order.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use thiserror::Error;
use tracing::trace;

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("network returned {actual} outputs for a batch of {expected}")]
    OutputMismatch { expected: usize, actual: usize },
}

/// Proof-cost value heads, already softmaxed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDistributions {
    pub value_n: Vec<f32>,
    pub value_m: Vec<f32>,
}

/// Network output for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkOutput {
    /// Probability per action id; sums to at most 1.
    pub policy: Vec<f32>,

    /// Raw logit per action id.
    pub policy_logits: Vec<f32>,

    /// Expected value. For proof-cost networks this is `Σ j · value_n[j]`.
    pub value: f32,

    /// Present only for proof-cost networks.
    pub distributions: Option<ValueDistributions>,
}

impl NetworkOutput {
    pub fn new(policy: Vec<f32>, policy_logits: Vec<f32>, value: f32) -> Self {
        Self {
            policy,
            policy_logits,
            value,
            distributions: None,
        }
    }

    /// Build an output from policy logits and a scalar value.
    pub fn from_logits(policy_logits: Vec<f32>, value: f32) -> Self {
        Self::new(softmax(&policy_logits), policy_logits, value)
    }

    /// Build a proof-cost output from policy, `value_n`, and `value_m` logits.
    pub fn from_proof_cost_logits(
        policy_logits: Vec<f32>,
        value_n_logits: &[f32],
        value_m_logits: &[f32],
    ) -> Self {
        let value_n = softmax(value_n_logits);
        let value_m = softmax(value_m_logits);
        Self {
            policy: softmax(&policy_logits),
            policy_logits,
            value: expected_value(&value_n),
            distributions: Some(ValueDistributions { value_n, value_m }),
        }
    }

    /// Expected `value_n` and `value_m`, if this is a proof-cost output.
    pub fn expected_values(&self) -> Option<(f32, f32)> {
        self.distributions
            .as_ref()
            .map(|d| (expected_value(&d.value_n), expected_value(&d.value_m)))
    }
}

/// Numerically stable softmax. An empty input yields an empty output.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max_logit.is_finite() {
        return vec![0.0; logits.len()];
    }

    let mut exp_values: Vec<f32> = logits.iter().map(|&l| (l - max_logit).exp()).collect();
    let exp_sum: f32 = exp_values.iter().sum();
    if exp_sum > 0.0 {
        for v in &mut exp_values {
            *v /= exp_sum;
        }
    }
    exp_values
}

/// `Σ j · p[j]` of a discrete distribution over bins `0..p.len()`.
pub fn expected_value(distribution: &[f32]) -> f32 {
    distribution
        .iter()
        .enumerate()
        .map(|(j, &p)| j as f32 * p)
        .sum()
}

/// A batched policy/value function.
///
/// Implementations could be:
/// - UniformNetwork: uniform policy and a constant value (for testing)
/// - OnnxNetwork: neural network inference (feature `onnx`)
pub trait Network: Send + Sync {
    /// Identifier written into game records.
    fn name(&self) -> &str;

    /// Length of the policy vector.
    fn action_size(&self) -> usize;

    /// Number of value bins; 1 for scalar-value networks.
    fn value_size(&self) -> usize {
        1
    }

    /// Evaluate a batch. Must return exactly one output per input, in order.
    fn evaluate_batch(&self, features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError>;
}

/// Network that assigns equal probability to every action and a fixed value.
/// Useful for testing MCTS without a model.
#[derive(Debug, Clone)]
pub struct UniformNetwork {
    action_size: usize,
    value: f32,
}

impl UniformNetwork {
    pub fn new(action_size: usize) -> Self {
        Self {
            action_size,
            value: 0.0,
        }
    }

    /// Return `value` for every position instead of 0.
    pub fn with_value(mut self, value: f32) -> Self {
        self.value = value;
        self
    }

    fn output(&self) -> NetworkOutput {
        let prob = if self.action_size == 0 {
            0.0
        } else {
            1.0 / self.action_size as f32
        };
        NetworkOutput::new(
            vec![prob; self.action_size],
            vec![0.0; self.action_size],
            self.value,
        )
    }
}

impl Network for UniformNetwork {
    fn name(&self) -> &str {
        "uniform"
    }

    fn action_size(&self) -> usize {
        self.action_size
    }

    fn evaluate_batch(&self, features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError> {
        Ok(features.iter().map(|_| self.output()).collect())
    }
}

/// Snapshot of a [`BatchEvaluator`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchStats {
    pub forward_count: u64,
    pub position_count: u64,
    pub last_batch_size: usize,
    pub avg_batch_size: f64,
    pub avg_inference_us: f64,
}

/// Thread-safe batch accumulator over one network.
///
/// `push_back` may be called concurrently; `forward` is called by a single
/// thread once all pushes of a phase are done. Slot indices returned by
/// `push_back` index the vector returned by the next `forward`.
pub struct BatchEvaluator<N> {
    network: N,
    batch: Mutex<Vec<Vec<f32>>>,
    /// Number of forward calls that ran the network (for diagnostics)
    forward_count: AtomicU64,
    /// Number of positions evaluated (for diagnostics)
    position_count: AtomicU64,
    /// Total inference time in microseconds (for diagnostics)
    total_inference_time_us: AtomicU64,
    last_batch_size: AtomicUsize,
}

impl<N> std::fmt::Debug for BatchEvaluator<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEvaluator")
            .field("forward_count", &self.forward_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<N: Network> BatchEvaluator<N> {
    pub fn new(network: N) -> Self {
        Self {
            network,
            batch: Mutex::new(Vec::new()),
            forward_count: AtomicU64::new(0),
            position_count: AtomicU64::new(0),
            total_inference_time_us: AtomicU64::new(0),
            last_batch_size: AtomicUsize::new(0),
        }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn action_size(&self) -> usize {
        self.network.action_size()
    }

    /// Append `features` to the pending batch and return its slot.
    pub fn push_back(&self, features: Vec<f32>) -> usize {
        let mut batch = self.batch.lock().unwrap_or_else(PoisonError::into_inner);
        batch.push(features);
        batch.len() - 1
    }

    /// Run the network on everything pushed since the last call.
    ///
    /// Returns one output per slot, in slot order, and leaves the batch
    /// empty. An empty batch returns an empty vector without touching the
    /// network.
    pub fn forward(&self) -> Result<Vec<NetworkOutput>, EvaluatorError> {
        let inputs = std::mem::take(&mut *self.batch.lock().unwrap_or_else(PoisonError::into_inner));
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let outputs = self.network.evaluate_batch(&inputs)?;
        let elapsed_us = start.elapsed().as_micros() as u64;

        if outputs.len() != inputs.len() {
            return Err(EvaluatorError::OutputMismatch {
                expected: inputs.len(),
                actual: outputs.len(),
            });
        }

        self.forward_count.fetch_add(1, Ordering::Relaxed);
        self.position_count
            .fetch_add(inputs.len() as u64, Ordering::Relaxed);
        self.total_inference_time_us
            .fetch_add(elapsed_us, Ordering::Relaxed);
        self.last_batch_size.store(inputs.len(), Ordering::Relaxed);
        trace!(batch_size = inputs.len(), elapsed_us, "forward");

        Ok(outputs)
    }

    /// Positions pushed but not yet evaluated.
    pub fn pending(&self) -> usize {
        self.batch.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn stats(&self) -> BatchStats {
        let forward_count = self.forward_count.load(Ordering::Relaxed);
        let position_count = self.position_count.load(Ordering::Relaxed);
        let total_us = self.total_inference_time_us.load(Ordering::Relaxed);
        let per_forward = |total: u64| {
            if forward_count == 0 {
                0.0
            } else {
                total as f64 / forward_count as f64
            }
        };
        BatchStats {
            forward_count,
            position_count,
            last_batch_size: self.last_batch_size.load(Ordering::Relaxed),
            avg_batch_size: per_forward(position_count),
            avg_inference_us: per_forward(total_us),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Echoes the first feature of each input as the value.
    struct EchoNetwork;

    impl Network for EchoNetwork {
        fn name(&self) -> &str {
            "echo"
        }

        fn action_size(&self) -> usize {
            2
        }

        fn evaluate_batch(&self, features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError> {
            Ok(features
                .iter()
                .map(|f| NetworkOutput::from_logits(vec![0.0, 0.0], f[0]))
                .collect())
        }
    }

    struct BrokenNetwork;

    impl Network for BrokenNetwork {
        fn name(&self) -> &str {
            "broken"
        }

        fn action_size(&self) -> usize {
            1
        }

        fn evaluate_batch(&self, _features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_uniform_network() {
        let network = UniformNetwork::new(9).with_value(0.5);
        let outputs = network.evaluate_batch(&[vec![], vec![]]).unwrap();

        assert_eq!(outputs.len(), 2);
        let sum: f32 = outputs[0].policy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(outputs[1].value, 0.5);
        assert!(outputs[0].distributions.is_none());
    }

    #[test]
    fn test_softmax() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(p[2] > p[1] && p[1] > p[0]);
        assert!(softmax(&[]).is_empty());
        // Large logits must not overflow
        let p = softmax(&[1000.0, 1000.0]);
        assert!((p[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_expected_value() {
        assert_eq!(expected_value(&[0.0, 0.0, 1.0]), 2.0);
        assert!((expected_value(&[0.5, 0.0, 0.5]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_proof_cost_output() {
        let mut value_n = vec![-100.0; 200];
        value_n[10] = 100.0;
        let output = NetworkOutput::from_proof_cost_logits(vec![0.0; 4], &value_n, &[0.0, 0.0]);

        assert!((output.value - 10.0).abs() < 1e-3);
        let (n, m) = output.expected_values().unwrap();
        assert!((n - 10.0).abs() < 1e-3);
        assert!((m - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_forward_returns_outputs_in_slot_order() {
        let evaluator = BatchEvaluator::new(EchoNetwork);
        assert_eq!(evaluator.push_back(vec![10.0]), 0);
        assert_eq!(evaluator.push_back(vec![20.0]), 1);
        assert_eq!(evaluator.push_back(vec![30.0]), 2);
        assert_eq!(evaluator.pending(), 3);

        let outputs = evaluator.forward().unwrap();
        let values: Vec<f32> = outputs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
        assert_eq!(evaluator.pending(), 0);

        // Slots restart after each forward
        assert_eq!(evaluator.push_back(vec![1.0]), 0);
    }

    #[test]
    fn test_empty_forward_skips_network() {
        let evaluator = BatchEvaluator::new(BrokenNetwork);
        assert!(evaluator.forward().unwrap().is_empty());
        assert_eq!(evaluator.stats().forward_count, 0);
    }

    #[test]
    fn test_output_count_mismatch_is_an_error() {
        let evaluator = BatchEvaluator::new(BrokenNetwork);
        evaluator.push_back(vec![0.0]);
        let err = evaluator.forward().unwrap_err();
        assert!(matches!(
            err,
            EvaluatorError::OutputMismatch {
                expected: 1,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_concurrent_push_back_assigns_unique_slots() {
        let evaluator = Arc::new(BatchEvaluator::new(EchoNetwork));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let evaluator = Arc::clone(&evaluator);
                std::thread::spawn(move || (i, evaluator.push_back(vec![i as f32])))
            })
            .collect();
        let slots: Vec<(usize, usize)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let outputs = evaluator.forward().unwrap();
        assert_eq!(outputs.len(), 8);
        for (i, slot) in slots {
            assert_eq!(outputs[slot].value, i as f32);
        }
    }

    #[test]
    fn test_stats() {
        let evaluator = BatchEvaluator::new(UniformNetwork::new(3));
        for _ in 0..4 {
            evaluator.push_back(vec![]);
        }
        evaluator.forward().unwrap();
        evaluator.push_back(vec![]);
        evaluator.push_back(vec![]);
        evaluator.forward().unwrap();

        let stats = evaluator.stats();
        assert_eq!(stats.forward_count, 2);
        assert_eq!(stats.position_count, 6);
        assert_eq!(stats.last_batch_size, 2);
        assert!((stats.avg_batch_size - 3.0).abs() < 1e-9);
    }
}
