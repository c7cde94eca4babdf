//! Error types for the training and inference pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a pipeline stage. Each variant renders a user-facing message.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No usable target could be derived from the disposition column.
    #[error("Target column 'koi_disposition' not usable: {0}. Cannot proceed.")]
    MissingTarget(String),

    /// No numeric feature columns remained after cleaning.
    #[error("No numeric feature columns remain after preprocessing")]
    EmptyFeatures,

    /// An inference request did not cover every trained feature.
    #[error("Missing values for required features: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// A row or matrix had the wrong number of features.
    #[error("Feature mismatch: expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not enough data to train: {0}")]
    InsufficientData(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Failures of the artifact store. All of them mean "no trained model available".
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("No trained model available: {} is missing", .path.display())]
    Missing { path: PathBuf },

    #[error("No trained model available: {} is corrupt ({reason})", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("No trained model available: {} has format version {found}, expected {expected}", .path.display())]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("No trained model available: stored artifacts come from different training runs ({0})")]
    Mismatched(String),

    #[error("Artifact I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_lists_missing_features() {
        let err = PipelineError::SchemaMismatch {
            missing: vec!["koi_period".into(), "koi_depth".into()],
        };
        assert_eq!(
            err.to_string(),
            "Missing values for required features: koi_period, koi_depth"
        );
    }

    #[test]
    fn artifact_errors_read_as_no_model() {
        let err: PipelineError = ArtifactError::Missing {
            path: PathBuf::from("model.json"),
        }
        .into();
        assert!(err.to_string().starts_with("No trained model available"));
    }
}
