//! Binary fraud classifier backed by ONNX Runtime

use crate::models::loader::LoadedModel;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Probability at or above which class 1 wins when no label output exists
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Maps one assembled feature row to a class id (1 = fraud).
pub trait Classifier: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Predict the class of a single row
    fn predict(&self, features: &[f32]) -> Result<i64>;
}

/// Classifier exported to ONNX (scikit-learn, XGBoost, LightGBM, CatBoost).
pub struct OnnxClassifier {
    name: String,
    session: Mutex<ort::session::Session>,
    input_name: String,
    /// Int64 class output, e.g. `label` or `output_label`
    label_output: Option<String>,
    /// Probability output used when no label is exported
    probability_output: Option<String>,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel) -> Result<Self> {
        let (label_output, probability_output) = resolve_outputs(&model.output_names);

        if label_output.is_none() && probability_output.is_none() {
            anyhow::bail!("Model {} exposes neither a label nor a probability output", model.name);
        }

        debug!(
            model = %model.name,
            label_output = ?label_output,
            probability_output = ?probability_output,
            "Classifier outputs resolved"
        );

        Ok(Self {
            name: model.name,
            session: Mutex::new(model.session),
            input_name: model.input_name,
            label_output,
            probability_output,
        })
    }

    /// Read the class from the outputs of a single-row run
    fn extract_class(&self, outputs: &ort::session::SessionOutputs) -> Result<i64> {
        if let Some(label_name) = &self.label_output {
            if let Some(output) = outputs.get(label_name.as_str()) {
                if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                    if let Some(&class) = data.first() {
                        debug!(model = %self.name, class = class, "Extracted label");
                        return Ok(class);
                    }
                }
                // Some exporters emit float labels
                if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                    if let Some(&class) = data.first() {
                        return Ok(class_from_float_label(class));
                    }
                }
                warn!(model = %self.name, output = %label_name, "Unreadable label output");
            }
        }

        let probability = self.extract_probability(outputs)?;
        Ok(class_from_probability(probability))
    }

    /// Extract the fraud probability.
    /// Handles both tensor outputs (XGBoost, RandomForest) and seq(map) outputs (CatBoost, LightGBM)
    fn extract_probability(&self, outputs: &ort::session::SessionOutputs) -> Result<f64> {
        let output_name = self
            .probability_output
            .as_deref()
            .context("Model has no probability output")?;
        let output = outputs
            .get(output_name)
            .with_context(|| format!("Output {} missing from run", output_name))?;

        let dtype = output.dtype();

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let prob = fraud_probability_from_tensor(&dims, data)
                .context("Empty probability tensor")?;
            debug!(model = %self.name, prob = prob, "Extracted from tensor");
            return Ok(prob);
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output);
        }

        anyhow::bail!("Unsupported probability output type {:?}", dtype)
    }

    /// Extract probability from seq(map(int64, float)) format
    fn extract_from_sequence_map(&self, output: &ort::value::DynValue) -> Result<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let first = maps.first().context("Empty probability sequence")?;
        let kv_pairs = first.try_extract_key_values::<i64, f32>()?;

        fraud_probability_from_pairs(&kv_pairs).context("No probability found in map")
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f32]) -> Result<i64> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .with_context(|| format!("Inference failed for model {}", self.name))?;

        self.extract_class(&outputs)
    }
}

/// Pick the label output and the probability output from a graph's output names.
///
/// The label is the first name containing `label`. The probability output is
/// the first name containing `prob`, else the first name that is not a label.
pub fn resolve_outputs(output_names: &[String]) -> (Option<String>, Option<String>) {
    let label_output = output_names
        .iter()
        .find(|name| name.contains("label"))
        .cloned();

    let probability_output = output_names
        .iter()
        .find(|name| name.contains("prob"))
        .or_else(|| output_names.iter().find(|name| !name.contains("label")))
        .cloned();

    (label_output, probability_output)
}

/// Float labels count as fraud only when exactly 1
pub fn class_from_float_label(label: f32) -> i64 {
    if label == 1.0 {
        1
    } else {
        0
    }
}

/// Class 1 iff its probability reaches the decision threshold
pub fn class_from_probability(probability: f64) -> i64 {
    if probability >= DECISION_THRESHOLD {
        1
    } else {
        0
    }
}

/// Fraud probability from a `[batch, classes]`, `[classes]` or single-score tensor
pub fn fraud_probability_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = match dims {
        [_, classes] => *classes,
        [classes] => *classes,
        _ => return data.last().map(|&v| v as f64),
    };

    match classes {
        c if c >= 2 => data.get(1).map(|&v| v as f64),
        1 => data.first().map(|&v| v as f64),
        _ => None,
    }
}

/// Fraud probability from class-id/probability pairs
pub fn fraud_probability_from_pairs(pairs: &[(i64, f32)]) -> Option<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Some(*prob as f64);
    }
    pairs
        .iter()
        .find(|(class, _)| *class == 0)
        .map(|(_, prob)| 1.0 - *prob as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_resolve_sklearn_outputs() {
        let (label, prob) = resolve_outputs(&names(&["output_label", "output_probability"]));
        assert_eq!(label.as_deref(), Some("output_label"));
        assert_eq!(prob.as_deref(), Some("output_probability"));
    }

    #[test]
    fn test_resolve_xgboost_outputs() {
        let (label, prob) = resolve_outputs(&names(&["label", "probabilities"]));
        assert_eq!(label.as_deref(), Some("label"));
        assert_eq!(prob.as_deref(), Some("probabilities"));
    }

    #[test]
    fn test_resolve_unnamed_score_output() {
        let (label, prob) = resolve_outputs(&names(&["variable"]));
        assert_eq!(label, None);
        assert_eq!(prob.as_deref(), Some("variable"));
    }

    #[test]
    fn test_resolve_no_outputs() {
        assert_eq!(resolve_outputs(&[]), (None, None));
    }

    #[test]
    fn test_resolve_label_only() {
        let (label, prob) = resolve_outputs(&names(&["label"]));
        assert_eq!(label.as_deref(), Some("label"));
        assert_eq!(prob, None);
    }

    #[test]
    fn test_float_label_must_equal_one() {
        assert_eq!(class_from_float_label(1.0), 1);
        assert_eq!(class_from_float_label(0.6), 0);
        assert_eq!(class_from_float_label(0.0), 0);
        assert_eq!(class_from_float_label(2.0), 0);
    }

    #[test]
    fn test_class_from_probability() {
        assert_eq!(class_from_probability(0.49), 0);
        assert_eq!(class_from_probability(0.5), 1);
        assert_eq!(class_from_probability(0.97), 1);
    }

    #[test]
    fn test_probability_from_tensor_shapes() {
        // [batch, classes]
        assert_eq!(fraud_probability_from_tensor(&[1, 2], &[0.25, 0.75]), Some(0.75));
        // [batch, 1]
        assert_eq!(fraud_probability_from_tensor(&[1, 1], &[0.25]), Some(0.25));
        // [classes]
        assert_eq!(fraud_probability_from_tensor(&[2], &[0.5, 0.5]), Some(0.5));
        // scalar-ish fallback
        assert_eq!(fraud_probability_from_tensor(&[], &[0.125]), Some(0.125));
        assert_eq!(fraud_probability_from_tensor(&[1, 2], &[]), None);
    }

    #[test]
    fn test_probability_from_pairs() {
        assert_eq!(fraud_probability_from_pairs(&[(0, 0.75), (1, 0.25)]), Some(0.25));
        assert_eq!(fraud_probability_from_pairs(&[(0, 0.75)]), Some(0.25));
        assert_eq!(fraud_probability_from_pairs(&[(3, 0.75)]), None);
    }
}
