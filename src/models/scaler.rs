//! Rescalers for the time and amount features

use crate::models::loader::LoadedModel;
use anyhow::{bail, Context, Result};
use ort::value::Tensor;
use serde::Deserialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Maps a raw `[time, amount]` pair onto the distribution seen in training.
pub trait Rescaler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Rescale one `[time, amount]` row
    fn transform(&self, row: [f64; 2]) -> Result<[f64; 2]>;
}

/// Standard-scaler parameters exported from the training pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    /// Per-feature mean
    pub mean: Vec<f64>,
    /// Per-feature standard deviation
    pub scale: Vec<f64>,
    /// Subtract the mean before scaling
    #[serde(default = "default_true")]
    pub with_mean: bool,
    /// Divide by the scale
    #[serde(default = "default_true")]
    pub with_std: bool,
}

fn default_true() -> bool {
    true
}

impl StandardScaler {
    /// Build a scaler from explicit parameters.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self {
            mean,
            scale,
            with_mean: true,
            with_std: true,
        };
        scaler.check()?;
        Ok(scaler)
    }

    /// Parse scaler parameters from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let scaler: Self =
            serde_json::from_str(json).context("Failed to parse scaler parameters")?;
        scaler.check()?;
        Ok(scaler)
    }

    /// Load scaler parameters from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler from {:?}", path))?;
        Self::from_json_str(&json)
    }

    /// Number of features the scaler was fit on.
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn check(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            bail!(
                "scaler mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            );
        }
        if self.mean.len() != 2 {
            bail!(
                "scaler must be fit on [time, amount], found {} features",
                self.mean.len()
            );
        }
        Ok(())
    }

    /// Rescale one row of any width matching the fitted features.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            bail!(
                "scaler expects {} features, got {}",
                self.n_features(),
                row.len()
            );
        }

        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&mean, &scale))| {
                let centered = if self.with_mean { x - mean } else { x };
                // Constant features were fit with zero variance.
                let scale = if scale == 0.0 { 1.0 } else { scale };
                if self.with_std {
                    centered / scale
                } else {
                    centered
                }
            })
            .collect())
    }
}

impl Rescaler for StandardScaler {
    fn name(&self) -> &str {
        "standard_scaler"
    }

    fn transform(&self, row: [f64; 2]) -> Result<[f64; 2]> {
        let scaled = self.transform_row(&row)?;
        Ok([scaled[0], scaled[1]])
    }
}

/// Scaler exported as an ONNX graph.
pub struct OnnxRescaler {
    name: String,
    session: Mutex<ort::session::Session>,
    input_name: String,
    output_name: String,
}

impl OnnxRescaler {
    pub fn new(model: LoadedModel) -> Result<Self> {
        let output_name = model
            .output_names
            .first()
            .cloned()
            .context("Scaler graph has no outputs")?;

        Ok(Self {
            name: model.name,
            session: Mutex::new(model.session),
            input_name: model.input_name,
            output_name,
        })
    }
}

impl Rescaler for OnnxRescaler {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, row: [f64; 2]) -> Result<[f64; 2]> {
        let input = vec![row[0] as f32, row[1] as f32];
        let input_tensor = Tensor::from_array((vec![1_i64, 2], input))
            .context("Failed to create scaler input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        let output = outputs
            .get(self.output_name.as_str())
            .with_context(|| format!("Scaler output {} missing", self.output_name))?;
        let (_, data) = output.try_extract_tensor::<f32>()?;

        if data.len() < 2 {
            bail!("scaler returned {} values, expected 2", data.len());
        }

        debug!(scaler = %self.name, time = data[0], amount = data[1], "Scaled features");

        Ok([data[0] as f64, data[1] as f64])
    }
}
