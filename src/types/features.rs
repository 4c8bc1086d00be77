//! Feature vector schema shared by training and inference

use serde::{Deserialize, Serialize};

/// Numerical feature names, in model input order
pub const NUMERICAL_FEATURES: [&str; 7] = [
    "transaction_amount",
    "monthly_income",
    "annual_fee",
    "reward_rate",
    "credit_limit",
    "signup_bonus",
    "foreign_fee",
];

/// Categorical feature names, in model input order
pub const CATEGORICAL_FEATURES: [&str; 5] = [
    "category",
    "credit_score",
    "time_of_day",
    "day_of_week",
    "card_type",
];

/// Total number of model input columns
pub const FEATURE_COUNT: usize = NUMERICAL_FEATURES.len() + CATEGORICAL_FEATURES.len();

pub const CATEGORIES: [&str; 8] = [
    "dining",
    "groceries",
    "travel",
    "gas",
    "shopping",
    "entertainment",
    "utilities",
    "general",
];

pub const CREDIT_SCORES: [&str; 5] = ["poor", "fair", "good", "very_good", "excellent"];

pub const TIMES_OF_DAY: [&str; 3] = ["morning", "afternoon", "evening"];

pub const DAYS_OF_WEEK: [&str; 2] = ["weekday", "weekend"];

pub const CARD_TYPES: [&str; 5] = ["cashback", "travel", "premium", "student", "business"];

/// A single flat record consumed by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Purchase amount
    pub transaction_amount: f64,
    /// Card holder monthly income
    pub monthly_income: f64,
    /// Annual card fee
    pub annual_fee: f64,
    /// Reward rate for the purchase category
    pub reward_rate: f64,
    /// Typical credit limit for the card
    pub credit_limit: f64,
    /// Signup bonus amount
    pub signup_bonus: f64,
    /// Foreign transaction fee (fraction)
    pub foreign_fee: f64,

    /// Merchant category (dining, travel, ...)
    pub category: String,
    /// Credit score band (poor .. excellent)
    pub credit_score: String,
    /// morning, afternoon or evening
    pub time_of_day: String,
    /// weekday or weekend
    pub day_of_week: String,
    /// Card product type (cashback, travel, ...)
    pub card_type: String,
}

impl FeatureVector {
    /// Numerical values in `NUMERICAL_FEATURES` order
    pub fn numerical(&self) -> [f64; 7] {
        [
            self.transaction_amount,
            self.monthly_income,
            self.annual_fee,
            self.reward_rate,
            self.credit_limit,
            self.signup_bonus,
            self.foreign_fee,
        ]
    }

    /// Categorical values in `CATEGORICAL_FEATURES` order
    pub fn categorical(&self) -> [&str; 5] {
        [
            &self.category,
            &self.credit_score,
            &self.time_of_day,
            &self.day_of_week,
            &self.card_type,
        ]
    }
}

/// A labelled training record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    #[serde(flatten)]
    pub features: FeatureVector,
    /// Target recommendation score in [0, 1]
    pub recommendation_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vector() -> FeatureVector {
        FeatureVector {
            transaction_amount: 50.0,
            monthly_income: 5000.0,
            annual_fee: 95.0,
            reward_rate: 3.0,
            credit_limit: 10000.0,
            signup_bonus: 200.0,
            foreign_fee: 0.0,
            category: "dining".to_string(),
            credit_score: "good".to_string(),
            time_of_day: "evening".to_string(),
            day_of_week: "weekday".to_string(),
            card_type: "cashback".to_string(),
        }
    }

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_COUNT, 12);
    }

    #[test]
    fn test_column_order() {
        let v = sample_vector();
        assert_eq!(v.numerical()[0], 50.0);
        assert_eq!(v.numerical()[3], 3.0);
        assert_eq!(v.categorical()[0], "dining");
        assert_eq!(v.categorical()[4], "cashback");
    }

    #[test]
    fn test_training_sample_is_flat() {
        let sample = TrainingSample {
            features: sample_vector(),
            recommendation_score: 0.7,
        };

        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["category"], "dining");
        assert_eq!(value["recommendation_score"], 0.7);
        assert!(value.get("features").is_none());
    }
}
