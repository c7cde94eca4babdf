//! Raw KOI table → clean feature matrix, binary target, and fitted imputer.

use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::matrix::FeatureMatrix;
use crate::data::model::{ColumnData, RawTable};

/// Identifier, metadata and leakage columns removed before training.
pub const DROPPED_COLUMNS: &[&str] = &[
    "rowid",
    "kepid",
    "kepoi_name",
    "kepler_name",
    "koi_pdisposition",
    "koi_score",
    "koi_tce_delivname",
];

/// Name fragments marking upper/lower uncertainty-bound columns.
pub const ERROR_MARGIN_PATTERNS: &[&str] = &["_err1", "_err2"];

pub const TARGET_COLUMN: &str = "koi_disposition";

/// Accepted dispositions and their class index.
pub const DISPOSITION_CLASSES: &[(&str, usize)] = &[("CANDIDATE", 1), ("CONFIRMED", 0)];

// ---------------------------------------------------------------------------
// Imputer
// ---------------------------------------------------------------------------

/// Mean imputation fitted per feature, keyed by feature name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
}

impl Imputer {
    /// Learn the per-column mean over non-missing values. A column with no
    /// observed values falls back to 0.
    pub fn fit(feature_names: Vec<String>, x: &FeatureMatrix) -> Self {
        let means = (0..x.n_cols())
            .map(|col| {
                let (sum, count) = x
                    .column(col)
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if count == 0 { 0.0 } else { sum / count as f64 }
            })
            .collect();
        Self {
            feature_names,
            means,
        }
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Shape check for a deserialized imputer.
    pub fn validate(&self) -> Result<(), String> {
        if self.means.len() != self.feature_names.len() {
            return Err(format!(
                "{} means for {} feature names",
                self.means.len(),
                self.feature_names.len()
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn fill_value(&self, feature: &str) -> Option<f64> {
        self.feature_names
            .iter()
            .position(|n| n == feature)
            .map(|i| self.means[i])
    }

    /// Replace NaN cells of one row in place.
    pub fn transform_row(&self, row: &mut [f64]) -> Result<(), PipelineError> {
        if row.len() != self.means.len() {
            return Err(PipelineError::FeatureCount {
                expected: self.means.len(),
                got: row.len(),
            });
        }
        for (value, mean) in row.iter_mut().zip(&self.means) {
            if value.is_nan() {
                *value = *mean;
            }
        }
        Ok(())
    }

    pub fn transform(&self, x: &mut FeatureMatrix) -> Result<(), PipelineError> {
        for r in 0..x.n_rows() {
            self.transform_row(x.row_mut(r))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Output of [`preprocess`]: everything the trainer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    /// Imputed numeric features, one row per labelled object.
    pub features: FeatureMatrix,
    /// Class index per row: 1 = candidate, 0 = confirmed.
    pub target: Vec<usize>,
    pub imputer: Imputer,
    /// Column order used for the matrix, the imputer and every later artifact.
    pub feature_names: Vec<String>,
}

fn is_error_margin(name: &str) -> bool {
    ERROR_MARGIN_PATTERNS.iter().any(|p| name.contains(p))
}

fn disposition_class(value: &str) -> Option<usize> {
    DISPOSITION_CLASSES
        .iter()
        .find(|(label, _)| *label == value)
        .map(|(_, class)| *class)
}

/// Clean a raw KOI table, derive the binary target, and impute features.
pub fn preprocess(table: &RawTable) -> Result<PreparedData, PipelineError> {
    let kept: Vec<_> = table
        .columns()
        .iter()
        .filter(|c| !DROPPED_COLUMNS.contains(&c.name.as_str()))
        .filter(|c| !is_error_margin(&c.name))
        .collect();

    let target_col = kept
        .iter()
        .find(|c| c.name == TARGET_COLUMN)
        .ok_or_else(|| PipelineError::MissingTarget("column not found".to_string()))?;

    let (rows, target): (Vec<usize>, Vec<usize>) = match &target_col.data {
        ColumnData::Text(values) => values
            .iter()
            .enumerate()
            .filter_map(|(row, v)| {
                v.as_deref()
                    .and_then(disposition_class)
                    .map(|class| (row, class))
            })
            .unzip(),
        ColumnData::Numeric(_) => (Vec::new(), Vec::new()),
    };

    if rows.is_empty() {
        return Err(PipelineError::MissingTarget(
            "no rows with disposition CANDIDATE or CONFIRMED".to_string(),
        ));
    }

    let numeric: Vec<(&str, &Vec<f64>)> = kept
        .iter()
        .filter(|c| c.name != TARGET_COLUMN)
        .filter_map(|c| match &c.data {
            ColumnData::Numeric(values) => Some((c.name.as_str(), values)),
            ColumnData::Text(_) => None,
        })
        .collect();

    if numeric.is_empty() {
        return Err(PipelineError::EmptyFeatures);
    }

    let feature_names: Vec<String> = numeric.iter().map(|(name, _)| name.to_string()).collect();
    let mut features = FeatureMatrix::zeros(rows.len(), numeric.len());
    for (out_row, &src_row) in rows.iter().enumerate() {
        for (col, (_, values)) in numeric.iter().enumerate() {
            features.set(out_row, col, values[src_row]);
        }
    }

    let imputer = Imputer::fit(feature_names.clone(), &features);
    imputer.transform(&mut features)?;

    log::info!(
        "Preprocessed {} labelled rows into {} numeric features ({} candidates)",
        rows.len(),
        feature_names.len(),
        target.iter().filter(|&&c| c == 1).count()
    );

    Ok(PreparedData {
        features,
        target,
        imputer,
        feature_names,
    })
}
