//! Feature assembly for fraud model inference.
//!
//! Only the first ("time") and last ("amount") features were scaled during
//! training. Everything in between reaches the model as submitted.

use anyhow::{bail, Result};

/// Minimum vector length: one time and one amount feature.
pub const MIN_FEATURES: usize = 2;

/// Splits raw feature vectors into the scaled pair and rebuilds the model input.
#[derive(Debug, Clone, Default)]
pub struct FeatureAssembler {
    /// Expected feature count, when known
    expected: Option<usize>,
}

impl FeatureAssembler {
    /// Create an assembler that accepts any length of at least two.
    pub fn new() -> Self {
        Self { expected: None }
    }

    /// Create an assembler that also enforces the model's trained arity.
    pub fn with_feature_count(expected: usize) -> Self {
        Self {
            expected: Some(expected),
        }
    }

    /// Expected feature count, if configured.
    pub fn feature_count(&self) -> Option<usize> {
        self.expected
    }

    /// Check the vector shape before any scaling happens.
    pub fn validate(&self, features: &[f64]) -> Result<()> {
        if features.len() < MIN_FEATURES {
            bail!(
                "feature vector needs at least {} values, got {}",
                MIN_FEATURES,
                features.len()
            );
        }
        if let Some(expected) = self.expected {
            if features.len() != expected {
                bail!(
                    "feature vector has {} values, model expects {}",
                    features.len(),
                    expected
                );
            }
        }
        Ok(())
    }

    /// Extract `[time, amount]` for the scaler.
    pub fn split(&self, features: &[f64]) -> Result<[f64; 2]> {
        self.validate(features)?;
        Ok([features[0], features[features.len() - 1]])
    }

    /// Rebuild the model input: scaled time, the untouched middle, scaled amount.
    pub fn assemble(&self, features: &[f64], scaled: [f64; 2]) -> Result<Vec<f32>> {
        self.validate(features)?;

        let middle = &features[1..features.len() - 1];
        let mut assembled = Vec::with_capacity(features.len());
        assembled.push(scaled[0] as f32);
        assembled.extend(middle.iter().map(|&v| v as f32));
        assembled.push(scaled[1] as f32);

        Ok(assembled)
    }
}
