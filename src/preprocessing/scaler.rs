//! Standard (z-score) scaling of numerical features

use super::PreprocessError;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Per-column mean/variance normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit on rows of observations (one row per sample).
    ///
    /// Uses the population standard deviation; constant columns get a
    /// scale of 1.0 so they pass through centred but unscaled.
    pub fn fit(rows: &Array2<f64>) -> Result<Self, PreprocessError> {
        if rows.nrows() == 0 {
            return Err(PreprocessError::EmptyInput);
        }

        let mean = rows
            .mean_axis(Axis(0))
            .ok_or(PreprocessError::EmptyInput)?;
        let scale = rows
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        Ok(Self { mean, scale })
    }

    /// Scale a single row
    pub fn transform(&self, row: ArrayView1<f64>) -> Result<Array1<f64>, PreprocessError> {
        if row.len() != self.mean.len() {
            return Err(PreprocessError::DimensionMismatch {
                expected: self.mean.len(),
                actual: row.len(),
            });
        }
        Ok((&row - &self.mean) / &self.scale)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_mean_and_scale() {
        let rows = array![[1.0, 10.0], [3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        assert_eq!(scaler.mean(), &array![2.0, 10.0]);
        assert_eq!(scaler.scale(), &array![1.0, 1.0]);
    }

    #[test]
    fn test_transform() {
        let rows = array![[0.0], [10.0], [20.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        let scaled = scaler.transform(array![20.0].view()).unwrap();
        let expected = 10.0 / (200.0_f64 / 3.0).sqrt();
        assert!((scaled[0] - expected).abs() < 1e-9);

        let centred = scaler.transform(array![10.0].view()).unwrap();
        assert!(centred[0].abs() < 1e-12);
    }

    #[test]
    fn test_empty_and_mismatched_input() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(&empty).is_err());

        let scaler = StandardScaler::fit(&array![[1.0, 2.0]]).unwrap();
        assert!(scaler.transform(array![1.0].view()).is_err());
    }
}
