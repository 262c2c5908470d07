//! UPI Fraud Detection API
//!
//! Serves a pre-trained fraud classifier over HTTP. Callers post a feature
//! vector; the service rescales time and amount, runs the model and answers
//! "Fraud" or "Not Fraud".

pub mod config;
pub mod error;
pub mod feature_assembler;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod types;

pub use config::AppConfig;
pub use feature_assembler::FeatureAssembler;
pub use models::inference::InferenceEngine;
pub use routes::{router, AppState};
pub use types::{Label, PredictRequest, PredictResponse};
