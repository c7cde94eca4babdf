//! Single-object classification against a stored artifact set.

use std::collections::BTreeMap;
use std::fmt;

use super::artifacts::{ArtifactSet, ArtifactStore};
use super::error::{ArtifactError, PipelineError};
use super::forest::argmax;

/// Features the prediction form highlights.
pub const KEY_FEATURES: &[&str] = &[
    "koi_fpflag_ss",
    "koi_fpflag_co",
    "koi_fpflag_nt",
    "koi_model_snr",
    "koi_duration",
    "koi_prad",
    "koi_depth",
    "koi_period",
    "koi_impact",
];

/// Feature name → user-supplied value. NaN marks a blank value to be imputed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionRequest {
    values: BTreeMap<String, f64>,
}

impl PredictionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with(mut self, feature: impl Into<String>, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    pub fn set(&mut self, feature: impl Into<String>, value: f64) {
        self.values.insert(feature.into(), value);
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.values.get(feature).copied()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PredictionRequest {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanetClass {
    /// Class 0.
    Confirmed,
    /// Class 1: candidate or possible false positive.
    Candidate,
}

impl PlanetClass {
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            PlanetClass::Confirmed
        } else {
            PlanetClass::Candidate
        }
    }

    pub fn index(self) -> usize {
        match self {
            PlanetClass::Confirmed => 0,
            PlanetClass::Candidate => 1,
        }
    }
}

impl fmt::Display for PlanetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanetClass::Confirmed => write!(f, "CONFIRMED EXOPLANET"),
            PlanetClass::Candidate => write!(f, "CANDIDATE / POTENTIAL FALSE POSITIVE"),
        }
    }
}

/// Advisory model output; `confidence` is the forest's probability for `class`.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class: PlanetClass,
    pub confidence: f64,
    pub probabilities: Vec<f64>,
}

pub struct InferenceEngine {
    artifacts: ArtifactSet,
}

impl InferenceEngine {
    pub fn new(artifacts: ArtifactSet) -> Self {
        Self { artifacts }
    }

    pub fn load(store: &ArtifactStore) -> Result<Self, ArtifactError> {
        store.load().map(Self::new)
    }

    pub fn feature_names(&self) -> &[String] {
        self.artifacts.feature_names()
    }

    pub fn run_id(&self) -> &str {
        &self.artifacts.run_id
    }

    /// Lay the request out in training column order, filling blank values
    /// from the imputer. Any absent feature name is a schema mismatch.
    pub fn assemble_row(&self, request: &PredictionRequest) -> Result<Vec<f64>, PipelineError> {
        let names = self.feature_names();
        let missing: Vec<String> = names
            .iter()
            .filter(|name| request.get(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::SchemaMismatch { missing });
        }

        let mut row: Vec<f64> = names
            .iter()
            .map(|name| request.get(name).unwrap_or(f64::NAN))
            .collect();
        self.artifacts.imputer.transform_row(&mut row)?;
        Ok(row)
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<Prediction, PipelineError> {
        let row = self.assemble_row(request)?;
        let scaled = self.artifacts.scaler.transform_row(&row)?;
        let probabilities = self.artifacts.model.predict_proba_row(&scaled);
        let class_idx = argmax(&probabilities);
        let prediction = Prediction {
            class: PlanetClass::from_index(class_idx),
            confidence: probabilities[class_idx],
            probabilities,
        };
        log::info!(
            "Predicted {} with confidence {:.2}%",
            prediction.class,
            prediction.confidence * 100.0
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::artifacts::tests::trained_set;

    fn full_request() -> PredictionRequest {
        PredictionRequest::new()
            .with("koi_period", 26.0)
            .with("koi_depth", 300.0)
            .with("koi_model_snr", 11.0)
            .with("koi_impact", 0.5)
    }

    #[test]
    fn missing_feature_is_rejected_before_scaling() {
        let engine = InferenceEngine::new(trained_set());
        let request: PredictionRequest =
            [("koi_period", 26.0), ("koi_depth", 300.0), ("koi_impact", 0.5)]
                .into_iter()
                .collect();
        match engine.assemble_row(&request) {
            Err(PipelineError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec!["koi_model_snr"])
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
        assert!(matches!(
            engine.predict(&request),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn row_follows_training_column_order() {
        let engine = InferenceEngine::new(trained_set());
        let row = engine.assemble_row(&full_request().with("extra", 1.0)).unwrap();
        assert_eq!(row, vec![26.0, 300.0, 11.0, 0.5]);
    }

    #[test]
    fn blank_values_are_imputed() {
        let set = trained_set();
        let depth_mean = set.imputer.fill_value("koi_depth").unwrap();
        let engine = InferenceEngine::new(set);
        let row = engine
            .assemble_row(&full_request().with("koi_depth", f64::NAN))
            .unwrap();
        assert_eq!(row[1], depth_mean);
    }

    #[test]
    fn confidence_is_probability_of_predicted_class() {
        let engine = InferenceEngine::new(trained_set());
        let prediction = engine.predict(&full_request()).unwrap();
        assert_eq!(prediction.class, PlanetClass::Candidate);
        assert_eq!(
            prediction.confidence,
            prediction.probabilities[prediction.class.index()]
        );
        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert!(prediction.confidence >= 0.5);
    }

    #[test]
    fn loaded_engine_matches_in_memory_engine() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let set = trained_set();
        store.save(&set).unwrap();
        let loaded = InferenceEngine::load(&store).unwrap();
        let fresh = InferenceEngine::new(set);
        assert_eq!(
            loaded.predict(&full_request()).unwrap(),
            fresh.predict(&full_request()).unwrap()
        );
    }
}
