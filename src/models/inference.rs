//! Inference engine: rescale, reassemble, classify

use crate::config::AppConfig;
use crate::feature_assembler::FeatureAssembler;
use crate::models::classifier::Classifier;
use crate::models::loader::ArtifactLoader;
use crate::models::scaler::Rescaler;
use crate::types::Label;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of model inference
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Label returned to the caller
    pub label: Label,
    /// Raw class id from the model
    pub class: i64,
    /// Scaled `[time, amount]`
    pub scaled: [f64; 2],
}

/// Holds the loaded artifacts for the lifetime of the process
pub struct InferenceEngine {
    assembler: FeatureAssembler,
    scaler: Arc<dyn Rescaler>,
    classifier: Arc<dyn Classifier>,
}

impl InferenceEngine {
    /// Create an engine from already loaded artifacts
    pub fn new(
        assembler: FeatureAssembler,
        scaler: Arc<dyn Rescaler>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            assembler,
            scaler,
            classifier,
        }
    }

    /// Load both artifacts named in the configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let artifacts = &config.artifacts;
        let loader = ArtifactLoader::with_threads(artifacts.onnx_threads)?;

        let scaler = loader
            .load_scaler(&artifacts.scaler_path)
            .context("Failed to load scaler")?;
        let classifier = loader
            .load_classifier(&artifacts.model_path)
            .context("Failed to load model")?;

        let assembler = match artifacts.feature_count {
            Some(count) => FeatureAssembler::with_feature_count(count),
            None => FeatureAssembler::new(),
        };

        info!(
            scaler = %scaler.name(),
            model = %classifier.name(),
            feature_count = ?assembler.feature_count(),
            "Inference engine initialized"
        );

        Ok(Self::new(assembler, scaler, classifier))
    }

    pub fn scaler_name(&self) -> &str {
        self.scaler.name()
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify one raw feature vector
    pub fn predict(&self, features: &[f64]) -> Result<PredictionResult> {
        let raw = self.assembler.split(features)?;
        let scaled = self
            .scaler
            .transform(raw)
            .context("Scaling time and amount failed")?;
        let assembled = self.assembler.assemble(features, scaled)?;

        let class = self.classifier.predict(&assembled)?;
        let label = Label::from_class(class);

        debug!(
            model = %self.classifier.name(),
            features = features.len(),
            time = raw[0],
            amount = raw[1],
            class = class,
            label = %label,
            "Inference complete"
        );

        Ok(PredictionResult {
            label,
            class,
            scaled,
        })
    }
}
