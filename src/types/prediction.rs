//! Prediction request and response payloads

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Raw feature vector: time first, amount last
    pub features: Vec<f64>,
}

/// Body returned by `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictResponse {
    pub prediction: Label,
}

/// Human-readable classification returned to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Fraud")]
    Fraud,
    #[serde(rename = "Not Fraud")]
    NotFraud,
}

impl Label {
    /// Model class id for fraud
    pub const FRAUD_CLASS: i64 = 1;

    /// Map a model class id to a label; only class 1 is fraud
    pub fn from_class(class: i64) -> Self {
        if class == Self::FRAUD_CLASS {
            Label::Fraud
        } else {
            Label::NotFraud
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fraud => "Fraud",
            Label::NotFraud => "Not Fraud",
        }
    }

    pub fn is_fraud(&self) -> bool {
        matches!(self, Label::Fraud)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_class() {
        assert_eq!(Label::from_class(1), Label::Fraud);
        assert_eq!(Label::from_class(0), Label::NotFraud);
        assert_eq!(Label::from_class(-1), Label::NotFraud);
        assert_eq!(Label::from_class(2), Label::NotFraud);
    }

    #[test]
    fn test_response_serialization() {
        let fraud = PredictResponse {
            prediction: Label::Fraud,
        };
        let not_fraud = PredictResponse {
            prediction: Label::NotFraud,
        };

        assert_eq!(
            serde_json::to_string(&fraud).unwrap(),
            r#"{"prediction":"Fraud"}"#
        );
        assert_eq!(
            serde_json::to_string(&not_fraud).unwrap(),
            r#"{"prediction":"Not Fraud"}"#
        );
    }

    #[test]
    fn test_request_accepts_integers_and_floats() {
        let req: PredictRequest =
            serde_json::from_str(r#"{"features": [100000, 0, 1.5, 250.0]}"#).unwrap();
        assert_eq!(req.features, vec![100000.0, 0.0, 1.5, 250.0]);
    }

    #[test]
    fn test_request_rejects_missing_key() {
        assert!(serde_json::from_str::<PredictRequest>(r#"{"values": [1, 2]}"#).is_err());
        assert!(serde_json::from_str::<PredictRequest>(r#"{"features": [1, "x"]}"#).is_err());
    }
}
