use std::ops::RangeInclusive;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ml::PipelineError;

// ---------------------------------------------------------------------------
// Training hyperparameters
// ---------------------------------------------------------------------------

pub const TREE_COUNT_RANGE: RangeInclusive<usize> = 100..=2000;
pub const TREE_COUNT_STEP: usize = 100;
pub const MAX_DEPTH_RANGE: RangeInclusive<usize> = 5..=50;
pub const TEST_SIZE_RANGE: RangeInclusive<f64> = 0.1..=0.5;
pub const TEST_SIZE_STEP: f64 = 0.05;

/// Seed shared by the split and the forest so runs are reproducible.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    /// Held-out fraction reserved for evaluation.
    pub test_size: f64,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_trees: 1600,
            max_depth: 30,
            test_size: 0.3,
            seed: DEFAULT_SEED,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !TREE_COUNT_RANGE.contains(&self.n_trees) {
            return Err(PipelineError::InvalidConfig(format!(
                "tree count {} outside {}..={}",
                self.n_trees,
                TREE_COUNT_RANGE.start(),
                TREE_COUNT_RANGE.end()
            )));
        }
        if !MAX_DEPTH_RANGE.contains(&self.max_depth) {
            return Err(PipelineError::InvalidConfig(format!(
                "max depth {} outside {}..={}",
                self.max_depth,
                MAX_DEPTH_RANGE.start(),
                MAX_DEPTH_RANGE.end()
            )));
        }
        // Small tolerance so slider values like 0.1 + 8 * 0.05 still pass.
        if self.test_size < TEST_SIZE_RANGE.start() - 1e-9
            || self.test_size > TEST_SIZE_RANGE.end() + 1e-9
        {
            return Err(PipelineError::InvalidConfig(format!(
                "held-out fraction {} outside {}..={}",
                self.test_size,
                TEST_SIZE_RANGE.start(),
                TEST_SIZE_RANGE.end()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Application settings
// ---------------------------------------------------------------------------

pub const ARTIFACT_DIR_ENV: &str = "EXODETECT_ARTIFACT_DIR";
pub const DEFAULT_DATASET_ENV: &str = "EXODETECT_DEFAULT_DATASET";
pub const DEFAULT_DATASET_FILE: &str = "cumulative_2025.09.20_06.45.53.csv";

/// Process-level settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    /// Directory holding `imputer.json`, `scaler.json` and `model.json`.
    pub artifact_dir: PathBuf,
    /// Bundled NASA export used when nothing was uploaded.
    pub default_dataset: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("."),
            default_dataset: PathBuf::from(DEFAULT_DATASET_FILE),
        }
    }
}

impl AppSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let settings = Self {
            artifact_dir: lookup(ARTIFACT_DIR_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            default_dataset: lookup(DEFAULT_DATASET_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.default_dataset),
        };
        log::info!(
            "Artifacts in {}, default dataset {}",
            settings.artifact_dir.display(),
            settings.default_dataset.display()
        );
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_bounds_values_are_rejected() {
        for config in [
            TrainConfig {
                n_trees: 50,
                ..TrainConfig::default()
            },
            TrainConfig {
                max_depth: 51,
                ..TrainConfig::default()
            },
            TrainConfig {
                test_size: 0.9,
                ..TrainConfig::default()
            },
        ] {
            assert!(matches!(
                config.validate(),
                Err(PipelineError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn settings_fall_back_to_defaults() {
        let settings = AppSettings::from_lookup(|key| match key {
            ARTIFACT_DIR_ENV => Some("/tmp/exo".to_string()),
            _ => Some("  ".to_string()),
        });
        assert_eq!(settings.artifact_dir, PathBuf::from("/tmp/exo"));
        assert_eq!(
            settings.default_dataset,
            PathBuf::from(DEFAULT_DATASET_FILE)
        );
    }
}
