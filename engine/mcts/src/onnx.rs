//! ONNX Runtime network for batched inference.
//!
//! # Model Format
//!
//! The ONNX model is expected to have:
//! - Input: "features" - shape (batch_size, feature_size) float32
//! - Output: "policy" - shape (batch_size, action_size) float32 logits
//! - Output: "value" - shape (batch_size, 1) float32 when `value_size == 1`
//! - Outputs: "value_n", "value_m" - shape (batch_size, bins) float32 logits
//!   for proof-cost models (`value_size > 1`)
//!
//! Softmax is applied on the host.

use std::path::Path;
use std::sync::Mutex;

use ort::{session::Session, value::Value};
use tracing::info;

use crate::evaluator::{EvaluatorError, Network, NetworkOutput};

/// Value outputs of one batch, flattened row-major.
#[derive(Debug)]
enum ValueHeads {
    Scalar(Vec<f32>),
    ProofCost { value_n: Vec<f32>, value_m: Vec<f32> },
}

/// ONNX Runtime network that loads and runs an exported model.
///
/// Uses a Mutex internally because `Session::run` requires `&mut self`,
/// but the `Network` trait uses `&self` for thread-safe sharing.
pub struct OnnxNetwork {
    session: Mutex<Session>,
    name: String,
    feature_size: usize,
    action_size: usize,
    value_size: usize,
    device_id: usize,
}

impl std::fmt::Debug for OnnxNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxNetwork")
            .field("name", &self.name)
            .field("feature_size", &self.feature_size)
            .field("action_size", &self.action_size)
            .field("value_size", &self.value_size)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

impl OnnxNetwork {
    /// Load an ONNX model from the given path.
    ///
    /// # Arguments
    /// * `model_path` - Path to the .onnx model file
    /// * `device_id` - Device slot this network serves, used for logging
    /// * `feature_size` - Length of one feature vector
    /// * `action_size` - Length of the policy output
    /// * `value_size` - 1 for a scalar value head, V for proof-cost heads
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        device_id: usize,
        feature_size: usize,
        action_size: usize,
        value_size: usize,
    ) -> Result<Self, EvaluatorError> {
        let model_path = model_path.as_ref();
        let session = Session::builder()
            .map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to create session builder: {}", e))
            })?
            .with_intra_threads(1)
            .map_err(|e| EvaluatorError::ModelError(format!("Failed to set intra threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| {
                EvaluatorError::ModelError(format!(
                    "Failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model = %model_path.display(),
            device_id,
            feature_size,
            action_size,
            value_size,
            "Loaded ONNX network (CPU execution provider)"
        );

        Ok(Self {
            session: Mutex::new(session),
            name,
            feature_size,
            action_size,
            value_size,
            device_id,
        })
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }

    fn is_proof_cost(&self) -> bool {
        self.value_size > 1
    }
}

/// Split flattened batch outputs into one [`NetworkOutput`] per row.
fn build_outputs(
    batch_size: usize,
    action_size: usize,
    policy_flat: &[f32],
    heads: &ValueHeads,
) -> Result<Vec<NetworkOutput>, EvaluatorError> {
    if policy_flat.len() != batch_size * action_size {
        return Err(EvaluatorError::ModelError(format!(
            "policy output has {} values, expected {} x {}",
            policy_flat.len(),
            batch_size,
            action_size
        )));
    }

    let row_width = |flat: &[f32], name: &str| -> Result<usize, EvaluatorError> {
        if batch_size == 0 || flat.len() % batch_size != 0 {
            return Err(EvaluatorError::ModelError(format!(
                "{} output has {} values for a batch of {}",
                name,
                flat.len(),
                batch_size
            )));
        }
        Ok(flat.len() / batch_size)
    };

    let policies = policy_flat.chunks_exact(action_size.max(1));
    match heads {
        ValueHeads::Scalar(values) => {
            let width = row_width(values, "value")?;
            Ok(policies
                .zip(values.chunks_exact(width))
                .map(|(logits, value)| NetworkOutput::from_logits(logits.to_vec(), value[0]))
                .collect())
        }
        ValueHeads::ProofCost { value_n, value_m } => {
            let n_width = row_width(value_n, "value_n")?;
            let m_width = row_width(value_m, "value_m")?;
            Ok(policies
                .zip(value_n.chunks_exact(n_width))
                .zip(value_m.chunks_exact(m_width))
                .map(|((logits, n), m)| {
                    NetworkOutput::from_proof_cost_logits(logits.to_vec(), n, m)
                })
                .collect())
        }
    }
}

impl Network for OnnxNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_size(&self) -> usize {
        self.action_size
    }

    fn value_size(&self) -> usize {
        self.value_size
    }

    fn evaluate_batch(&self, features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = features.len();
        let mut flat = Vec::with_capacity(batch_size * self.feature_size);
        for row in features {
            if row.len() != self.feature_size {
                return Err(EvaluatorError::InvalidInput(format!(
                    "Expected {} features, got {}",
                    self.feature_size,
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }

        // Create input tensor with shape (batch_size, feature_size)
        let input_array = ndarray::Array2::from_shape_vec((batch_size, self.feature_size), flat)
            .map_err(|e| {
                EvaluatorError::InvalidInput(format!("Failed to create batch input array: {}", e))
            })?;
        let input_value = Value::from_array(input_array).map_err(|e| {
            EvaluatorError::ModelError(format!("Failed to create batch input tensor: {}", e))
        })?;

        // Run inference - extract all data inside the lock scope
        let (policy_flat, action_size, heads) = {
            let mut session = self.session.lock().map_err(|e| {
                EvaluatorError::EvaluationFailed(format!("Failed to acquire session lock: {}", e))
            })?;
            let outputs = session
                .run(ort::inputs!["features" => input_value])
                .map_err(|e| {
                    EvaluatorError::EvaluationFailed(format!("Batch inference failed: {}", e))
                })?;

            let extract = |name: &str| -> Result<(Vec<i64>, Vec<f32>), EvaluatorError> {
                let output = outputs
                    .get(name)
                    .ok_or_else(|| EvaluatorError::ModelError(format!("Missing {} output", name)))?;
                let (shape, data) = output.try_extract_tensor::<f32>().map_err(|e| {
                    EvaluatorError::ModelError(format!("Failed to extract {} tensor: {}", name, e))
                })?;
                Ok((shape.iter().copied().collect(), data.to_vec()))
            };

            let (policy_shape, policy_flat) = extract("policy")?;
            let action_size = if policy_shape.len() > 1 {
                policy_shape[1] as usize
            } else {
                self.action_size
            };

            let heads = if self.is_proof_cost() {
                ValueHeads::ProofCost {
                    value_n: extract("value_n")?.1,
                    value_m: extract("value_m")?.1,
                }
            } else {
                ValueHeads::Scalar(extract("value")?.1)
            };
            (policy_flat, action_size, heads)
        };

        build_outputs(batch_size, action_size, &policy_flat, &heads)
    }
}
