//! Configuration management for the recommendation service

use crate::synthetic::{DEFAULT_SAMPLES, DEFAULT_SEED};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `CARD_RECOMMENDER__SERVER__PORT`
pub const ENV_PREFIX: &str = "CARD_RECOMMENDER";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

/// Model artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the model artifacts
    pub models_dir: String,
    /// Network weights and metadata
    pub model_file: String,
    /// Fitted scaler
    pub scaler_file: String,
    /// Fitted label encoders
    pub encoders_file: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            model_file: "credit_card_model.json".to_string(),
            scaler_file: "scaler.json".to_string(),
            encoders_file: "encoders.json".to_string(),
        }
    }
}

/// Training run configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Synthetic samples generated when no training data is supplied
    pub num_samples: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of samples held out for validation
    pub validation_split: f64,
    pub learning_rate: f32,
    /// Seed for data generation, weight initialization and shuffling
    pub seed: u64,
    pub early_stopping_patience: usize,
    pub lr_plateau_patience: usize,
    pub lr_plateau_factor: f32,
    pub min_learning_rate: f32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_samples: DEFAULT_SAMPLES,
            epochs: 100,
            batch_size: 32,
            validation_split: 0.2,
            learning_rate: 0.001,
            seed: DEFAULT_SEED,
            early_stopping_patience: 10,
            lr_plateau_patience: 5,
            lr_plateau_factor: 0.5,
            min_learning_rate: 0.0,
        }
    }
}

/// Periodic metrics summary configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between logged summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path.
    ///
    /// The file is optional; environment variables override it.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
