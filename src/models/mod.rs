//! ML artifacts: scaler, classifier, and the engine that chains them

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod scaler;

pub use classifier::{Classifier, OnnxClassifier};
pub use inference::{InferenceEngine, PredictionResult};
pub use loader::ArtifactLoader;
pub use scaler::{OnnxRescaler, Rescaler, StandardScaler};
