//! Feature encoding and scaling applied before the network

pub mod label_encoder;
pub mod scaler;

pub use label_encoder::{FeatureEncoders, LabelEncoder};
pub use scaler::StandardScaler;

use crate::types::features::{FeatureVector, CATEGORICAL_FEATURES, FEATURE_COUNT, NUMERICAL_FEATURES};
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while fitting or applying preprocessors
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot fit on an empty dataset")]
    EmptyInput,

    #[error("label '{value}' was not seen during fitting")]
    UnseenLabel { value: String },

    #[error("unknown value '{value}' for categorical feature '{feature}'")]
    UnknownCategory { feature: String, value: String },

    #[error("no encoder fitted for feature '{0}'")]
    MissingEncoder(String),

    #[error("expected {expected} columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Fitted scaler and encoders, applied together to build model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    pub scaler: StandardScaler,
    pub encoders: FeatureEncoders,
}

impl FeaturePreprocessor {
    /// Fit encoders and scaler on the given records
    pub fn fit(features: &[&FeatureVector]) -> Result<Self, PreprocessError> {
        if features.is_empty() {
            return Err(PreprocessError::EmptyInput);
        }

        let encoders = FeatureEncoders::fit(features);

        let mut numerical = Array2::<f64>::zeros((features.len(), NUMERICAL_FEATURES.len()));
        for (row, f) in features.iter().enumerate() {
            numerical
                .row_mut(row)
                .assign(&Array1::from(f.numerical().to_vec()));
        }
        let scaler = StandardScaler::fit(&numerical)?;

        Ok(Self { scaler, encoders })
    }

    /// Build the model input matrix: scaled numerical columns, then encoded
    /// categorical columns.
    pub fn transform(&self, features: &[&FeatureVector]) -> Result<Array2<f32>, PreprocessError> {
        let mut matrix = Array2::<f32>::zeros((features.len(), FEATURE_COUNT));
        let split = NUMERICAL_FEATURES.len();

        for (row, f) in features.iter().enumerate() {
            let numerical = Array1::from(f.numerical().to_vec());
            let scaled = self.scaler.transform(numerical.view())?;
            let encoded = self.encoders.encode(f)?;

            matrix
                .slice_mut(s![row, ..split])
                .assign(&scaled.mapv(|v| v as f32));
            matrix
                .slice_mut(s![row, split..split + CATEGORICAL_FEATURES.len()])
                .assign(&Array1::from(encoded.to_vec()).mapv(|v| v as f32));
        }

        Ok(matrix)
    }

    pub fn transform_one(&self, features: &FeatureVector) -> Result<Array2<f32>, PreprocessError> {
        self.transform(&[features])
    }
}
