//! Prediction and recommendation result structures

use serde::{Deserialize, Serialize};

/// Inputs that influenced a prediction, echoed back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factors {
    pub reward_rate: f64,
    pub annual_fee: f64,
    pub credit_score: String,
    pub category: String,
    pub transaction_amount: f64,
}

/// Model output for a single card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Recommendation score (0.0 - 1.0)
    pub score: f64,
    /// Distance of the score from 0.5, rescaled to 0.0 - 1.0
    pub confidence: f64,
    pub factors: Factors,
}

impl Prediction {
    pub fn new(score: f64, factors: Factors) -> Self {
        Self {
            score,
            confidence: confidence_for(score),
            factors,
        }
    }
}

/// Confidence is how far the score sits from the undecided midpoint
pub fn confidence_for(score: f64) -> f64 {
    (score - 0.5).abs() * 2.0
}

/// Factors attached to a card recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecommendationFactors {
    Analyzed(Factors),
    Failed { error: String },
}

/// Score for one of the caller's candidate cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRecommendation {
    /// The card exactly as supplied by the caller
    pub card: serde_json::Value,
    pub score: f64,
    pub confidence: f64,
    pub factors: RecommendationFactors,
}

impl CardRecommendation {
    /// Recommendation backed by a successful prediction
    pub fn from_prediction(card: serde_json::Value, prediction: Prediction) -> Self {
        Self {
            card,
            score: prediction.score,
            confidence: prediction.confidence,
            factors: RecommendationFactors::Analyzed(prediction.factors),
        }
    }

    /// Neutral placeholder used when a card could not be scored
    pub fn failed(card: serde_json::Value) -> Self {
        Self {
            card,
            score: 0.5,
            confidence: 0.5,
            factors: RecommendationFactors::Failed {
                error: "Prediction failed".to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.factors, RecommendationFactors::Failed { .. })
    }
}

/// Ranked recommendations across all candidate cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub recommended: Option<CardRecommendation>,
    pub alternatives: Vec<CardRecommendation>,
    pub all_recommendations: Vec<CardRecommendation>,
}

impl RecommendationSet {
    /// Number of runner-up cards reported as alternatives
    pub const MAX_ALTERNATIVES: usize = 2;

    /// Rank recommendations by score, best first
    pub fn rank(mut recommendations: Vec<CardRecommendation>) -> Self {
        recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));

        let recommended = recommendations.first().cloned();
        let alternatives = recommendations
            .iter()
            .skip(1)
            .take(Self::MAX_ALTERNATIVES)
            .cloned()
            .collect();

        Self {
            recommended,
            alternatives,
            all_recommendations: recommendations,
        }
    }
}
