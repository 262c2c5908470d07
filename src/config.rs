//! Configuration management for the fraud inference service

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub pages: PagesConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to bind
    pub port: u16,
}

impl ServerConfig {
    /// Resolve the listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

/// Scaler and model artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Scaler artifact (`.json` parameters or `.onnx` graph)
    pub scaler_path: String,
    /// Classifier artifact (`.onnx`)
    pub model_path: String,
    /// Number of threads for ONNX inference per session (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Expected feature vector length; unchecked when absent
    #[serde(default)]
    pub feature_count: Option<usize>,
}

fn default_onnx_threads() -> usize {
    1
}

/// Payment page assets
#[derive(Debug, Clone, Deserialize)]
pub struct PagesConfig {
    /// Directory holding `payment.html`
    pub template_dir: String,
    /// Directory served under `/static`
    pub static_dir: String,
}

/// Metrics reporting
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path.
    ///
    /// The file is optional; any key it omits keeps its built-in default.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults = Self::default();

        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("artifacts.scaler_path", defaults.artifacts.scaler_path)?
            .set_default("artifacts.model_path", defaults.artifacts.model_path)?
            .set_default("artifacts.onnx_threads", defaults.artifacts.onnx_threads as i64)?
            .set_default("pages.template_dir", defaults.pages.template_dir)?
            .set_default("pages.static_dir", defaults.pages.static_dir)?
            .set_default(
                "metrics.report_interval_secs",
                defaults.metrics.report_interval_secs as i64,
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .add_source(File::from(path.as_ref()).required(false))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            artifacts: ArtifactsConfig {
                scaler_path: "scaler.json".to_string(),
                model_path: "fraud_model.onnx".to_string(),
                onnx_threads: 1,
                feature_count: None,
            },
            pages: PagesConfig {
                template_dir: "templates".to_string(),
                static_dir: "static".to_string(),
            },
            metrics: MetricsConfig {
                report_interval_secs: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.artifacts.scaler_path, "scaler.json");
        assert_eq!(config.artifacts.model_path, "fraud_model.onnx");
        assert_eq!(config.artifacts.feature_count, None);
        assert_eq!(config.pages.template_dir, "templates");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.artifacts.onnx_threads, 1);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n\n[artifacts]\nmodel_path = \"models/xgb.onnx\"\nfeature_count = 30\n"
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.artifacts.model_path, "models/xgb.onnx");
        assert_eq!(config.artifacts.scaler_path, "scaler.json");
        assert_eq!(config.artifacts.feature_count, Some(30));
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig::default();
        let addr = config.server.socket_addr().unwrap();
        assert_eq!(addr.port(), 5000);

        let bad = ServerConfig {
            host: "not a host".to_string(),
            port: 1,
        };
        assert!(bad.socket_addr().is_err());
    }
}
