//! On-disk model artifacts

use crate::config::{ModelConfig, TrainingConfig};
use crate::models::network::Network;
use crate::models::recommender::{ModelMetadata, RecommendationModel};
use crate::models::trainer::TrainingOptions;
use crate::models::ModelError;
use crate::preprocessing::{FeatureEncoders, FeaturePreprocessor, StandardScaler};
use crate::synthetic::SyntheticDataGenerator;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Network weights stored together with their provenance
#[derive(Serialize, Deserialize)]
struct StoredNetwork {
    metadata: ModelMetadata,
    network: Network,
}

/// Locations of the three model artifact files
#[derive(Debug, Clone)]
pub struct ModelStore {
    model_path: PathBuf,
    scaler_path: PathBuf,
    encoders_path: PathBuf,
}

impl ModelStore {
    pub fn new(config: &ModelConfig) -> Self {
        let dir = Path::new(&config.models_dir);
        Self {
            model_path: dir.join(&config.model_file),
            scaler_path: dir.join(&config.scaler_file),
            encoders_path: dir.join(&config.encoders_file),
        }
    }

    /// Store using the default file names inside `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let config = ModelConfig {
            models_dir: dir.as_ref().to_string_lossy().into_owned(),
            ..ModelConfig::default()
        };
        Self::new(&config)
    }

    /// Whether every artifact file is present
    pub fn exists(&self) -> bool {
        [&self.model_path, &self.scaler_path, &self.encoders_path]
            .iter()
            .all(|p| p.exists())
    }

    /// Save the network, scaler and encoders of a trained model
    pub fn save(&self, model: &RecommendationModel) -> Result<()> {
        let (Some(preprocessor), Some(metadata)) = (model.preprocessor(), model.metadata()) else {
            return Err(ModelError::NothingToSave.into());
        };

        for path in [&self.model_path, &self.scaler_path, &self.encoders_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let stored = StoredNetwork {
            metadata: metadata.clone(),
            network: model.network().clone(),
        };

        // Every artifact is staged before any is replaced
        let staged = [
            (&self.model_path, to_json(&self.model_path, &stored)?),
            (&self.scaler_path, to_json(&self.scaler_path, &preprocessor.scaler)?),
            (&self.encoders_path, to_json(&self.encoders_path, &preprocessor.encoders)?),
        ];
        let mut written = Vec::with_capacity(staged.len());
        for (path, bytes) in &staged {
            let tmp = staging_path(path);
            if let Err(e) = fs::write(&tmp, bytes) {
                remove_staged(written.iter().chain(std::iter::once(&tmp)));
                return Err(e).with_context(|| format!("Failed to write {}", tmp.display()));
            }
            written.push(tmp);
        }
        for ((path, _), tmp) in staged.iter().zip(&written) {
            fs::rename(tmp, path)
                .with_context(|| format!("Failed to replace {}", path.display()))?;
        }

        info!(
            model_id = %metadata.model_id,
            path = %self.model_path.display(),
            "Model saved successfully"
        );
        Ok(())
    }

    /// Load a previously trained model
    pub fn load(&self) -> Result<RecommendationModel> {
        let stored: StoredNetwork = read_json(&self.model_path)?;
        let scaler: StandardScaler = read_json(&self.scaler_path)?;
        let encoders: FeatureEncoders = read_json(&self.encoders_path)?;

        let model_id = stored.metadata.model_id;
        let model = RecommendationModel::from_parts(
            stored.network,
            FeaturePreprocessor { scaler, encoders },
            stored.metadata,
        )
        .context("Stored model is incompatible with the feature schema")?;

        info!(model_id = %model_id, path = %self.model_path.display(), "Model loaded successfully");
        Ok(model)
    }
}

fn to_json<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).with_context(|| format!("Failed to serialize {}", path.display()))
}

/// Sibling path an artifact is written to before being renamed into place
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn remove_staged<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove staged artifact");
            }
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the stored model, or train on synthetic data and save it when no
/// usable model is on disk.
pub fn initialize(store: &ModelStore, training: &TrainingConfig) -> Result<RecommendationModel> {
    info!("Initializing AI model...");

    match store.load() {
        Ok(model) => {
            info!("AI model initialized successfully");
            return Ok(model);
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Could not load existing model");
        }
    }

    info!("Training new model...");
    let samples = SyntheticDataGenerator::new(training.seed)
        .generate(training.num_samples)
        .context("Failed to generate synthetic training data")?;
    let (model, _history) = RecommendationModel::train_new(&samples, &TrainingOptions::from(training))
        .context("Failed to train model")?;
    store.save(&model)?;

    info!("AI model initialized successfully");
    Ok(model)
}
