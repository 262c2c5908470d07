//! Test Payment Client
//!
//! Generates simulated payments and posts them to the prediction endpoint.

use chrono::{Local, Timelike};
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};
use upi_fraud_api::{Label, PredictRequest, PredictResponse};

/// Payment generator for testing
struct PaymentGenerator {
    rng: rand::rngs::ThreadRng,
    feature_count: usize,
}

impl PaymentGenerator {
    fn new(feature_count: usize) -> Self {
        Self {
            rng: rand::thread_rng(),
            feature_count: feature_count.max(2),
        }
    }

    /// A daytime payment of an everyday amount
    fn generate_legitimate(&mut self) -> PredictRequest {
        let time = Local::now().num_seconds_from_midnight() as f64;
        let amount = self.rng.gen_range(10.0..5000.0);
        self.build(time, amount)
    }

    /// A night-time payment of a large amount
    fn generate_suspicious(&mut self) -> PredictRequest {
        let time = self.rng.gen_range(0.0..6.0 * 3600.0);
        let amount = self.rng.gen_range(50_000.0..100_000.0);
        self.build(time, amount)
    }

    fn build(&mut self, time: f64, amount: f64) -> PredictRequest {
        let mut features = vec![0.0; self.feature_count];
        features[0] = time;
        for value in features.iter_mut().take(self.feature_count - 1).skip(1) {
            *value = self.rng.gen_range(0.0..0.5);
        }
        features[self.feature_count - 1] = amount;
        PredictRequest { features }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Payment Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://127.0.0.1:5000".to_string());
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);
    let feature_count: usize = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(30);

    info!(
        base_url = %base_url,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        feature_count = feature_count,
        "Configuration loaded"
    );

    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

    // Probe the liveness endpoint
    match client.get(format!("{}/", base_url)).send().await {
        Ok(response) if response.status().is_success() => {
            info!(status = %response.status(), "Connected to API");
        }
        Ok(response) => {
            warn!(status = %response.status(), "API not healthy. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms, feature_count).await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to reach API. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms, feature_count).await;
        }
    }

    let url = format!("{}/predict", base_url);
    let mut generator = PaymentGenerator::new(feature_count);
    let mut rng = rand::thread_rng();

    let mut sent_suspicious = 0;
    let mut flagged = 0;
    let mut failed = 0;

    for i in 0..count {
        let payment = if rng.gen_bool(fraud_rate) {
            sent_suspicious += 1;
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        match client.post(&url).json(&payment).send().await {
            Ok(response) if response.status().is_success() => {
                let body: PredictResponse = response.json().await?;
                if body.prediction == Label::Fraud {
                    flagged += 1;
                }
            }
            Ok(response) => {
                failed += 1;
                warn!(status = %response.status(), "Prediction request rejected");
            }
            Err(e) => {
                failed += 1;
                warn!(error = %e, "Prediction request failed");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} payments ({} suspicious, {} flagged as fraud, {} failed)",
                i + 1,
                count,
                sent_suspicious,
                flagged,
                failed
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} payments ({} suspicious, {} flagged as fraud, {} failed)",
        count, sent_suspicious, flagged, failed
    );

    Ok(())
}

async fn run_dry_mode(
    count: u64,
    fraud_rate: f64,
    delay_ms: u64,
    feature_count: usize,
) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no API connection)");

    let mut generator = PaymentGenerator::new(feature_count);
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let payment = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string(&payment)?;
            info!("Sample payment {}: {}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
