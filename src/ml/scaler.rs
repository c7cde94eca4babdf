//! Standard scaler (z-score normalization).
//!
//! `z = (x - u) / s` where `u` is the per-feature mean and `s` the population
//! standard deviation of the training partition. Constant features keep
//! `s = 1` so they map to zero instead of NaN.

use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::matrix::FeatureMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(feature_names: Vec<String>, x: &FeatureMatrix) -> Result<Self, PipelineError> {
        if x.n_rows() == 0 {
            return Err(PipelineError::InsufficientData(
                "cannot fit the scaler on an empty partition".to_string(),
            ));
        }
        if feature_names.len() != x.n_cols() {
            return Err(PipelineError::FeatureCount {
                expected: feature_names.len(),
                got: x.n_cols(),
            });
        }

        let n = x.n_rows() as f64;
        let mut mean = Vec::with_capacity(x.n_cols());
        let mut scale = Vec::with_capacity(x.n_cols());
        for col in 0..x.n_cols() {
            let mu = x.column(col).sum::<f64>() / n;
            let var = x.column(col).map(|v| (v - mu).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            mean.push(mu);
            scale.push(if std > f64::EPSILON { std } else { 1.0 });
        }

        Ok(Self {
            feature_names,
            mean,
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Shape and value checks for a deserialized scaler.
    pub fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.feature_names.len() || self.scale.len() != self.mean.len() {
            return Err(format!(
                "{} feature names, {} means, {} scales",
                self.feature_names.len(),
                self.mean.len(),
                self.scale.len()
            ));
        }
        if let Some(idx) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(format!("mean of feature {idx} is not finite"));
        }
        if let Some(idx) = self.scale.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(format!("scale of feature {idx} is {}", self.scale[idx]));
        }
        Ok(())
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, PipelineError> {
        if row.len() != self.mean.len() {
            return Err(PipelineError::FeatureCount {
                expected: self.mean.len(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (mu, s))| (v - mu) / s)
            .collect())
    }

    pub fn transform(&self, x: &FeatureMatrix) -> Result<FeatureMatrix, PipelineError> {
        let mut out = x.clone();
        for r in 0..x.n_rows() {
            let scaled = self.transform_row(x.row(r))?;
            out.row_mut(r).copy_from_slice(&scaled);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn train_partition_becomes_zero_mean_unit_variance() {
        let x = FeatureMatrix::from_rows(&[vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]])
            .unwrap();
        let scaler = StandardScaler::fit(names(2), &x).unwrap();
        let z = scaler.transform(&x).unwrap();
        for col in 0..2 {
            let values: Vec<f64> = z.column(col).collect();
            let mean = values.iter().sum::<f64>() / 3.0;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_feature_maps_to_zero() {
        let x = FeatureMatrix::from_rows(&[vec![5.0], vec![5.0]]).unwrap();
        let scaler = StandardScaler::fit(names(1), &x).unwrap();
        assert_eq!(scaler.scale, vec![1.0]);
        assert_eq!(scaler.transform_row(&[5.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn row_width_is_checked() {
        let x = FeatureMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        let scaler = StandardScaler::fit(names(2), &x).unwrap();
        assert!(matches!(
            scaler.transform_row(&[1.0]),
            Err(PipelineError::FeatureCount { expected: 2, got: 1 })
        ));
    }
}
