//! Request metrics and statistics tracking for the inference service.

use crate::types::Label;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept in memory
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector for prediction traffic
pub struct ServiceMetrics {
    /// Predictions that returned a label
    pub predictions_served: AtomicU64,
    /// Predictions that ended in a server error
    pub predictions_failed: AtomicU64,
    /// Predictions labelled "Fraud"
    pub fraud_predictions: AtomicU64,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            predictions_failed: AtomicU64::new(0),
            fraud_predictions: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, label: Label) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if label.is_fraud() {
            self.fraud_predictions.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut latencies) = self.latencies.write() {
            latencies.push(latency.as_micros() as u64);
            if latencies.len() > MAX_LATENCY_SAMPLES {
                latencies.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }
    }

    /// Record a failed prediction
    pub fn record_failure(&self) {
        self.predictions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get latency statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted: Vec<u64> = match self.latencies.read() {
            Ok(latencies) => latencies.clone(),
            Err(_) => return LatencyStats::default(),
        };
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Share of served predictions labelled fraud, in percent
    pub fn get_fraud_rate(&self) -> f64 {
        let served = self.predictions_served.load(Ordering::Relaxed);
        if served == 0 {
            return 0.0;
        }
        self.fraud_predictions.load(Ordering::Relaxed) as f64 / served as f64 * 100.0
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        // Fraud is incremented after served; read it first so it never exceeds served
        let fraud = self.fraud_predictions.load(Ordering::Relaxed);
        let served = self.predictions_served.load(Ordering::Relaxed);
        let failed = self.predictions_failed.load(Ordering::Relaxed);
        let latency = self.get_latency_stats();

        info!(
            served = served,
            failed = failed,
            fraud = fraud,
            not_fraud = served.saturating_sub(fraud),
            fraud_rate = format!("{:.1}%", self.get_fraud_rate()),
            throughput = format!("{:.2} req/s", self.get_throughput()),
            "Prediction summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Prediction latency"
        );
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
