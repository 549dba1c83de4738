// src/traits.rs
use crate::core::{FeatureMatrix, InsightError, Result};
use ndarray::ArrayView1;

/// A fitted rule artifact that can score coerced feature rows.
pub trait RulePredictor {
    type Output;

    /// Number of feature columns the artifact was induced on.
    fn num_features(&self) -> usize;

    /// Scores one row laid out in training feature order.
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> Self::Output;

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Self::Output>> {
        if features.ncols() != self.num_features() {
            return Err(InsightError::IncompatibleDimensions(format!(
                "Feature matrix has {} columns, but the rules expect {}.",
                features.ncols(),
                self.num_features()
            )));
        }
        Ok(features
            .values
            .rows()
            .into_iter()
            .map(|row| self.predict_row(row))
            .collect())
    }
}
