//! Type definitions for the fraud inference service

pub mod prediction;

pub use prediction::{Label, PredictRequest, PredictResponse};
