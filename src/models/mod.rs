//! Recommendation model: network, training, persistence and inference

pub mod network;
pub mod persistence;
pub mod recommender;
pub mod trainer;

pub use network::Network;
pub use persistence::ModelStore;
pub use recommender::{ModelInfo, RecommendationModel};
pub use trainer::{Trainer, TrainingHistory, TrainingOptions};

use crate::preprocessing::PreprocessError;
use thiserror::Error;

/// Errors raised by the recommendation model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model not trained. Please train the model first.")]
    NotTrained,

    #[error("No trained model to save")]
    NothingToSave,

    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("model expects {expected} input features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("model output was not a finite score")]
    InvalidOutput,
}
