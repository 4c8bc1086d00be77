//! Categorical label encoding

use super::PreprocessError;
use crate::types::features::{FeatureVector, CATEGORICAL_FEATURES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps each distinct categorical value to its index in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the observed values.
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Integer code for a value seen during fitting.
    pub fn transform(&self, value: &str) -> Result<usize, PreprocessError> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map_err(|_| PreprocessError::UnseenLabel {
                value: value.to_string(),
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// One fitted encoder per categorical feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoders {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl FeatureEncoders {
    pub fn fit(features: &[&FeatureVector]) -> Self {
        let encoders = CATEGORICAL_FEATURES
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let encoder = LabelEncoder::fit(features.iter().map(|&f| f.categorical()[idx]));
                (name.to_string(), encoder)
            })
            .collect();

        Self { encoders }
    }

    /// Encode the categorical columns of a feature vector
    pub fn encode(&self, features: &FeatureVector) -> Result<[f64; 5], PreprocessError> {
        let mut encoded = [0.0; 5];
        for (idx, (name, value)) in CATEGORICAL_FEATURES
            .iter()
            .zip(features.categorical())
            .enumerate()
        {
            let encoder = self
                .encoders
                .get(*name)
                .ok_or_else(|| PreprocessError::MissingEncoder(name.to_string()))?;
            encoded[idx] = encoder
                .transform(value)
                .map_err(|_| PreprocessError::UnknownCategory {
                    feature: name.to_string(),
                    value: value.to_string(),
                })? as f64;
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_are_sorted_and_unique() {
        let encoder = LabelEncoder::fit(["travel", "dining", "gas", "dining", "travel"]);
        assert_eq!(encoder.classes(), &["dining", "gas", "travel"]);
        assert_eq!(encoder.transform("dining").unwrap(), 0);
        assert_eq!(encoder.transform("gas").unwrap(), 1);
        assert_eq!(encoder.transform("travel").unwrap(), 2);
    }

    #[test]
    fn test_unseen_label() {
        let encoder = LabelEncoder::fit(["weekday", "weekend"]);
        let err = encoder.transform("holiday").unwrap_err();
        assert!(err.to_string().contains("holiday"));
    }

    #[test]
    fn test_feature_encoders() {
        let a = FeatureVector {
            transaction_amount: 10.0,
            monthly_income: 1000.0,
            annual_fee: 0.0,
            reward_rate: 1.0,
            credit_limit: 1000.0,
            signup_bonus: 0.0,
            foreign_fee: 0.0,
            category: "travel".to_string(),
            credit_score: "good".to_string(),
            time_of_day: "morning".to_string(),
            day_of_week: "weekday".to_string(),
            card_type: "premium".to_string(),
        };
        let mut b = a.clone();
        b.category = "dining".to_string();
        b.card_type = "cashback".to_string();

        let encoders = FeatureEncoders::fit(&[&a, &b]);
        assert_eq!(encoders.encode(&a).unwrap(), [1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(encoders.encode(&b).unwrap(), [0.0, 0.0, 0.0, 0.0, 0.0]);

        let mut c = a.clone();
        c.credit_score = "excellent".to_string();
        match encoders.encode(&c) {
            Err(PreprocessError::UnknownCategory { feature, value }) => {
                assert_eq!(feature, "credit_score");
                assert_eq!(value, "excellent");
            }
            other => panic!("expected unknown category, got {:?}", other),
        }
    }
}
