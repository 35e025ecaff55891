//! Network selection for the binary.

use engine_config::SelfPlayConfig;
use mcts::{EvaluatorError, Network, NetworkOutput, UniformNetwork};
use tracing::warn;

#[cfg(feature = "onnx")]
use mcts::OnnxNetwork;

/// The network behind one batch evaluator.
#[derive(Debug)]
pub enum AnyNetwork {
    Uniform(UniformNetwork),
    #[cfg(feature = "onnx")]
    Onnx(OnnxNetwork),
}

impl Network for AnyNetwork {
    fn name(&self) -> &str {
        match self {
            AnyNetwork::Uniform(n) => n.name(),
            #[cfg(feature = "onnx")]
            AnyNetwork::Onnx(n) => n.name(),
        }
    }

    fn action_size(&self) -> usize {
        match self {
            AnyNetwork::Uniform(n) => n.action_size(),
            #[cfg(feature = "onnx")]
            AnyNetwork::Onnx(n) => n.action_size(),
        }
    }

    fn value_size(&self) -> usize {
        match self {
            AnyNetwork::Uniform(n) => n.value_size(),
            #[cfg(feature = "onnx")]
            AnyNetwork::Onnx(n) => n.value_size(),
        }
    }

    fn evaluate_batch(&self, features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError> {
        match self {
            AnyNetwork::Uniform(n) => n.evaluate_batch(features),
            #[cfg(feature = "onnx")]
            AnyNetwork::Onnx(n) => n.evaluate_batch(features),
        }
    }
}

/// One network per device. An empty `nn_file_name` selects the uniform
/// network.
pub fn load_networks(
    settings: &SelfPlayConfig,
    num_devices: usize,
    feature_size: usize,
    action_size: usize,
) -> Result<Vec<AnyNetwork>, EvaluatorError> {
    if settings.nn_file_name.is_empty() {
        warn!("nn_file_name is empty, using uniform network");
        return Ok((0..num_devices)
            .map(|_| AnyNetwork::Uniform(UniformNetwork::new(action_size)))
            .collect());
    }
    load_model(settings, num_devices, feature_size, action_size)
}

#[cfg(feature = "onnx")]
fn load_model(
    settings: &SelfPlayConfig,
    num_devices: usize,
    feature_size: usize,
    action_size: usize,
) -> Result<Vec<AnyNetwork>, EvaluatorError> {
    let value_size = if settings.actor_use_proof_cost_backup {
        settings.nn_value_size as usize
    } else {
        1
    };
    (0..num_devices)
        .map(|device_id| {
            OnnxNetwork::load(
                &settings.nn_file_name,
                device_id,
                feature_size,
                action_size,
                value_size,
            )
            .map(AnyNetwork::Onnx)
        })
        .collect()
}

#[cfg(not(feature = "onnx"))]
fn load_model(
    settings: &SelfPlayConfig,
    _num_devices: usize,
    _feature_size: usize,
    _action_size: usize,
) -> Result<Vec<AnyNetwork>, EvaluatorError> {
    Err(EvaluatorError::ModelError(format!(
        "cannot load {}: built without the onnx feature",
        settings.nn_file_name
    )))
}
