//! Artifact loader for the scaler and the classifier

use crate::models::classifier::{Classifier, OnnxClassifier};
use crate::models::scaler::{OnnxRescaler, Rescaler, StandardScaler};
use anyhow::{bail, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// On-disk artifact format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Scaler parameters as JSON
    Json,
    /// ONNX graph
    Onnx,
}

impl ArtifactFormat {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Ok(ArtifactFormat::Json),
            Some("onnx") => Ok(ArtifactFormat::Onnx),
            _ => bail!("Unsupported artifact format: {}", path.display()),
        }
    }
}

/// Loaded ONNX session with metadata
pub struct LoadedModel {
    /// Artifact name (file stem)
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output names in graph order
    pub output_names: Vec<String>,
}

/// Loader for scaler and classifier artifacts
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a new loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load the scaler artifact
    pub fn load_scaler<P: AsRef<Path>>(&self, path: P) -> Result<Arc<dyn Rescaler>> {
        let path = path.as_ref();

        let scaler: Arc<dyn Rescaler> = match ArtifactFormat::from_path(path)? {
            ArtifactFormat::Json => Arc::new(StandardScaler::from_file(path)?),
            ArtifactFormat::Onnx => Arc::new(OnnxRescaler::new(self.load_session(path)?)?),
        };

        info!(scaler = %scaler.name(), path = %path.display(), "Scaler loaded");
        Ok(scaler)
    }

    /// Load the classifier artifact
    pub fn load_classifier<P: AsRef<Path>>(&self, path: P) -> Result<Arc<dyn Classifier>> {
        let path = path.as_ref();

        let classifier: Arc<dyn Classifier> = match ArtifactFormat::from_path(path)? {
            ArtifactFormat::Onnx => Arc::new(OnnxClassifier::new(self.load_session(path)?)?),
            ArtifactFormat::Json => {
                bail!("Classifier must be an ONNX model: {}", path.display())
            }
        };

        info!(model = %classifier.name(), path = %path.display(), "Classifier loaded");
        Ok(classifier)
    }

    /// Load a single ONNX graph from file
    pub fn load_session<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model")
            .to_string();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        info!(
            model = %name,
            input = %input_name,
            outputs = ?output_names,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            session,
            input_name,
            output_names,
        })
    }
}
