//! Stateful recommendation model: network plus fitted preprocessors

use crate::feature_extractor::FeatureExtractor;
use crate::models::network::Network;
use crate::models::trainer::{Trainer, TrainingHistory, TrainingOptions};
use crate::models::ModelError;
use crate::preprocessing::FeaturePreprocessor;
use crate::types::features::{
    FeatureVector, TrainingSample, CATEGORICAL_FEATURES, FEATURE_COUNT, NUMERICAL_FEATURES,
};
use crate::types::recommendation::{CardRecommendation, Prediction, RecommendationSet};
use crate::types::request::{CardData, TransactionContext, UserProfile};
use chrono::{DateTime, Local, TimeZone, Utc};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Provenance of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    pub epochs_run: usize,
    pub final_loss: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchitectureInfo {
    pub layers: usize,
    pub total_params: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureInfo {
    pub categorical: Vec<&'static str>,
    pub numerical: Vec<&'static str>,
    pub total: usize,
}

/// Summary reported by the model info endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub is_trained: bool,
    pub model_id: Option<Uuid>,
    pub trained_at: Option<DateTime<Utc>>,
    pub architecture: ArchitectureInfo,
    pub features: FeatureInfo,
}

/// Neural network with the scaler and label encoders it was trained with.
///
/// Created untrained; becomes usable for inference after `train` or when
/// loaded from disk.
#[derive(Debug)]
pub struct RecommendationModel {
    network: Network,
    preprocessor: Option<FeaturePreprocessor>,
    metadata: Option<ModelMetadata>,
    extractor: FeatureExtractor,
}

impl RecommendationModel {
    /// Untrained model with freshly initialized weights
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        info!("Neural network model architecture created");

        Self {
            network: Network::recommender(FEATURE_COUNT, &mut rng),
            preprocessor: None,
            metadata: None,
            extractor: FeatureExtractor::new(),
        }
    }

    /// Reassemble a trained model from persisted parts
    pub fn from_parts(
        network: Network,
        preprocessor: FeaturePreprocessor,
        metadata: ModelMetadata,
    ) -> Result<Self, ModelError> {
        if network.input_dim() != FEATURE_COUNT {
            return Err(ModelError::DimensionMismatch {
                expected: FEATURE_COUNT,
                actual: network.input_dim(),
            });
        }
        network.validate()?;

        Ok(Self {
            network,
            preprocessor: Some(preprocessor),
            metadata: Some(metadata),
            extractor: FeatureExtractor::new(),
        })
    }

    /// Build and train a new model in one step
    pub fn train_new(
        samples: &[TrainingSample],
        options: &TrainingOptions,
    ) -> Result<(Self, TrainingHistory), ModelError> {
        let mut model = Self::new(options.seed);
        let history = model.train(samples, options)?;
        Ok((model, history))
    }

    pub fn is_trained(&self) -> bool {
        self.preprocessor.is_some()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn preprocessor(&self) -> Option<&FeaturePreprocessor> {
        self.preprocessor.as_ref()
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    /// Fit preprocessors and train a fresh network on `samples`.
    ///
    /// The current model is left untouched if training fails.
    pub fn train(
        &mut self,
        samples: &[TrainingSample],
        options: &TrainingOptions,
    ) -> Result<TrainingHistory, ModelError> {
        info!(samples = samples.len(), "Starting model training");

        if let Some(bad) = samples
            .iter()
            .find(|s| !(0.0..=1.0).contains(&s.recommendation_score))
        {
            return Err(ModelError::InvalidTrainingData(format!(
                "recommendation_score {} is outside [0, 1]",
                bad.recommendation_score
            )));
        }

        let features: Vec<&FeatureVector> = samples.iter().map(|s| &s.features).collect();
        let preprocessor = FeaturePreprocessor::fit(&features)?;
        let x = preprocessor.transform(&features)?;
        let y: Array1<f32> = samples
            .iter()
            .map(|s| s.recommendation_score as f32)
            .collect();

        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut network = Network::recommender(FEATURE_COUNT, &mut rng);
        let history = Trainer::new(options.clone()).fit(&mut network, &x, &y)?;

        self.network = network;
        self.preprocessor = Some(preprocessor);
        self.metadata = Some(ModelMetadata {
            model_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            training_samples: samples.len(),
            epochs_run: history.epochs_run(),
            final_loss: history.final_loss(),
        });

        info!("Model training completed successfully");
        Ok(history)
    }

    /// Score an already extracted feature vector
    pub fn score(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let preprocessor = self.preprocessor.as_ref().ok_or(ModelError::NotTrained)?;
        let input = preprocessor.transform_one(features)?;
        let output = self.network.predict(&input);

        let score = output.first().copied().ok_or(ModelError::InvalidOutput)? as f64;
        if !score.is_finite() {
            return Err(ModelError::InvalidOutput);
        }
        Ok(score.clamp(0.0, 1.0))
    }

    /// Score one card for a transaction, using the local clock
    pub fn predict(
        &self,
        transaction: &TransactionContext,
        user: &UserProfile,
        card: &CardData,
    ) -> Result<Prediction, ModelError> {
        self.predict_at(transaction, user, card, &Local::now())
    }

    /// Score one card as if the transaction happened at `at`
    pub fn predict_at<Tz: TimeZone>(
        &self,
        transaction: &TransactionContext,
        user: &UserProfile,
        card: &CardData,
        at: &DateTime<Tz>,
    ) -> Result<Prediction, ModelError> {
        if !self.is_trained() {
            return Err(ModelError::NotTrained);
        }

        let features = self.extractor.extract(transaction, user, card, at);
        let score = self.score(&features)?;
        let factors = self.extractor.factors(transaction, user, card);

        debug!(
            card = %card.display_name(),
            category = %transaction.category,
            score = score,
            "Prediction complete"
        );

        Ok(Prediction::new(score, factors))
    }

    /// Rank candidate cards, using the local clock
    pub fn recommend(
        &self,
        transaction: &TransactionContext,
        user: &UserProfile,
        cards: &[serde_json::Value],
    ) -> RecommendationSet {
        self.recommend_at(transaction, user, cards, &Local::now())
    }

    /// Rank candidate cards. Cards that cannot be scored get a neutral
    /// placeholder instead of failing the whole request.
    pub fn recommend_at<Tz: TimeZone>(
        &self,
        transaction: &TransactionContext,
        user: &UserProfile,
        cards: &[serde_json::Value],
        at: &DateTime<Tz>,
    ) -> RecommendationSet {
        let recommendations = cards
            .iter()
            .map(|raw| {
                let card: CardData = match serde_json::from_value(raw.clone()) {
                    Ok(card) => card,
                    Err(e) => {
                        error!(error = %e, "Error parsing card data");
                        return CardRecommendation::failed(raw.clone());
                    }
                };

                match self.predict_at(transaction, user, &card, at) {
                    Ok(prediction) => CardRecommendation::from_prediction(raw.clone(), prediction),
                    Err(e) => {
                        error!(
                            card = %card.display_name(),
                            error = %e,
                            "Error predicting for card"
                        );
                        CardRecommendation::failed(raw.clone())
                    }
                }
            })
            .collect();

        RecommendationSet::rank(recommendations)
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            is_trained: self.is_trained(),
            model_id: self.metadata.as_ref().map(|m| m.model_id),
            trained_at: self.metadata.as_ref().map(|m| m.trained_at),
            architecture: ArchitectureInfo {
                layers: self.network.layer_count(),
                total_params: self.network.param_count(),
            },
            features: FeatureInfo {
                categorical: CATEGORICAL_FEATURES.to_vec(),
                numerical: NUMERICAL_FEATURES.to_vec(),
                total: FEATURE_COUNT,
            },
        }
    }
}
