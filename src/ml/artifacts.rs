//! Persistence of the fitted imputer, scaler and forest as a matched set.
//!
//! Each artifact is a JSON envelope:
//!
//! ```json
//! { "format": "exodetect-scaler", "version": 1, "run_id": "…", "payload": { … } }
//! ```
//!
//! All three envelopes of one training run share a `run_id`; loading rejects
//! sets whose ids or feature names disagree.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ArtifactError;
use super::forest::RandomForest;
use super::preprocess::Imputer;
use super::scaler::StandardScaler;
use super::train::N_CLASSES;

pub const IMPUTER_FILE: &str = "imputer.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";

/// Current on-disk format version for all three envelopes.
pub const FORMAT_VERSION: u32 = 1;

const IMPUTER_FORMAT: &str = "exodetect-imputer";
const SCALER_FORMAT: &str = "exodetect-scaler";
const MODEL_FORMAT: &str = "exodetect-model";

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    format: String,
    version: u32,
    run_id: String,
    payload: T,
}

/// Imputer, scaler and model from a single training run.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub run_id: String,
    pub imputer: Imputer,
    pub scaler: StandardScaler,
    pub model: RandomForest,
}

impl ArtifactSet {
    /// Feature order shared by all three artifacts.
    pub fn feature_names(&self) -> &[String] {
        &self.imputer.feature_names
    }

    /// Check the matched-set invariant: one feature order across all artifacts.
    pub fn check_aligned(&self) -> Result<(), ArtifactError> {
        if self.imputer.feature_names != self.scaler.feature_names {
            return Err(ArtifactError::Mismatched(
                "imputer and scaler feature names differ".to_string(),
            ));
        }
        if self.imputer.n_features() != self.scaler.n_features()
            || self.scaler.n_features() != self.model.n_features
        {
            return Err(ArtifactError::Mismatched(format!(
                "feature counts differ: imputer {}, scaler {}, model {}",
                self.imputer.n_features(),
                self.scaler.n_features(),
                self.model.n_features
            )));
        }
        Ok(())
    }
}

/// Stores artifacts under fixed names in one directory. A save overwrites the
/// previous set.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Whether all three artifacts are present.
    pub fn exists(&self) -> bool {
        [IMPUTER_FILE, SCALER_FILE, MODEL_FILE]
            .iter()
            .all(|name| self.path(name).is_file())
    }

    /// Persist a matched set.
    ///
    /// Every envelope is serialized and written to a temporary file in the
    /// target directory first; only once all three are on disk are they
    /// renamed over the previous files.
    pub fn save(&self, set: &ArtifactSet) -> Result<(), ArtifactError> {
        set.check_aligned()?;
        std::fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let staged = [
            self.stage(IMPUTER_FILE, IMPUTER_FORMAT, &set.run_id, &set.imputer)?,
            self.stage(SCALER_FILE, SCALER_FORMAT, &set.run_id, &set.scaler)?,
            self.stage(MODEL_FILE, MODEL_FORMAT, &set.run_id, &set.model)?,
        ];

        for (temp, target) in staged {
            temp.persist(&target).map_err(|err| ArtifactError::Io {
                path: target.clone(),
                source: err.error,
            })?;
        }
        log::info!(
            "Saved model artifacts (run {}) to {}",
            &set.run_id[..set.run_id.len().min(12)],
            self.dir.display()
        );
        Ok(())
    }

    fn stage<T: Serialize>(
        &self,
        name: &str,
        format: &str,
        run_id: &str,
        payload: &T,
    ) -> Result<(tempfile::NamedTempFile, PathBuf), ArtifactError> {
        let target = self.path(name);
        let envelope = Envelope {
            format: format.to_string(),
            version: FORMAT_VERSION,
            run_id: run_id.to_string(),
            payload,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|err| ArtifactError::Corrupt {
            path: target.clone(),
            reason: err.to_string(),
        })?;

        let io_err = |source| ArtifactError::Io {
            path: target.clone(),
            source,
        };
        let mut temp = tempfile::Builder::new()
            .prefix(".exodetect")
            .tempfile_in(&self.dir)
            .map_err(io_err)?;
        temp.write_all(&bytes).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        Ok((temp, target))
    }

    /// Reload the matched set. Fails if any artifact is missing, unreadable,
    /// from another format version, or from a different training run.
    pub fn load(&self) -> Result<ArtifactSet, ArtifactError> {
        let (imputer_run, imputer) = self.read::<Imputer>(IMPUTER_FILE, IMPUTER_FORMAT)?;
        let (scaler_run, scaler) = self.read::<StandardScaler>(SCALER_FILE, SCALER_FORMAT)?;
        let (model_run, model) = self.read::<RandomForest>(MODEL_FILE, MODEL_FORMAT)?;

        if imputer_run != scaler_run || scaler_run != model_run {
            return Err(ArtifactError::Mismatched(format!(
                "run ids imputer={imputer_run} scaler={scaler_run} model={model_run}"
            )));
        }

        let corrupt = |name: &str| {
            let path = self.path(name);
            move |reason: String| ArtifactError::Corrupt { path, reason }
        };
        imputer.validate().map_err(corrupt(IMPUTER_FILE))?;
        scaler.validate().map_err(corrupt(SCALER_FILE))?;
        if model.n_classes != N_CLASSES {
            return Err(corrupt(MODEL_FILE)(format!(
                "model has {} classes, expected {N_CLASSES}",
                model.n_classes
            )));
        }
        model.validate().map_err(corrupt(MODEL_FILE))?;

        let set = ArtifactSet {
            run_id: imputer_run,
            imputer,
            scaler,
            model,
        };
        set.check_aligned()?;
        log::info!(
            "Loaded model artifacts with {} features from {}",
            set.feature_names().len(),
            self.dir.display()
        );
        Ok(set)
    }

    fn read<T: DeserializeOwned>(
        &self,
        name: &str,
        format: &str,
    ) -> Result<(String, T), ArtifactError> {
        let path = self.path(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing { path });
            }
            Err(source) => return Err(ArtifactError::Io { path, source }),
        };

        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|err| ArtifactError::Corrupt {
                path: path.clone(),
                reason: err.to_string(),
            })?;

        if envelope.format != format {
            return Err(ArtifactError::Corrupt {
                path,
                reason: format!("expected format '{format}', found '{}'", envelope.format),
            });
        }
        if envelope.version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                path,
                found: envelope.version,
                expected: FORMAT_VERSION,
            });
        }
        Ok((envelope.run_id, envelope.payload))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::TrainConfig;
    use crate::ml::preprocess::Imputer;
    use crate::ml::train::tests::synthetic;
    use crate::ml::train::train_and_evaluate;

    pub(crate) fn trained_set() -> ArtifactSet {
        let (x, y, names) = synthetic(80, 21);
        let config = TrainConfig {
            n_trees: 100,
            max_depth: 5,
            test_size: 0.3,
            seed: 42,
        };
        let outcome = train_and_evaluate(&x, &y, &names, &config, &mut |_| {}).unwrap();
        ArtifactSet {
            run_id: "run-a".to_string(),
            imputer: Imputer::fit(names, &x),
            scaler: outcome.scaler,
            model: outcome.model,
        }
    }

    #[test]
    fn exists_only_after_complete_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(!store.exists());
        store.save(&trained_set()).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn round_trip_reproduces_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let set = trained_set();
        store.save(&set).unwrap();
        let loaded = store.load().unwrap();

        let sample = [12.0, 310.0, 18.0, 0.4];
        let original = set
            .model
            .predict_proba_row(&set.scaler.transform_row(&sample).unwrap());
        let restored = loaded
            .model
            .predict_proba_row(&loaded.scaler.transform_row(&sample).unwrap());
        assert_eq!(original, restored);
        assert_eq!(loaded.imputer, set.imputer);
    }

    #[test]
    fn saving_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let set = trained_set();
        store.save(&set).unwrap();
        let once = store.load().unwrap();
        store.save(&set).unwrap();
        let twice = store.load().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_blob_fails_explicitly() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&trained_set()).unwrap();
        std::fs::remove_file(dir.path().join(SCALER_FILE)).unwrap();
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(ArtifactError::Missing { .. })));
    }

    #[test]
    fn corrupt_blob_fails_explicitly() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&trained_set()).unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), b"{\"format\":").unwrap();
        assert!(matches!(store.load(), Err(ArtifactError::Corrupt { .. })));
    }

    /// Rewrite one field of a saved envelope's payload.
    fn edit_payload(path: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
        let text = std::fs::read_to_string(path).unwrap();
        let mut envelope: serde_json::Value = serde_json::from_str(&text).unwrap();
        edit(&mut envelope["payload"]);
        std::fs::write(path, serde_json::to_vec(&envelope).unwrap()).unwrap();
    }

    fn assert_corrupt(store: &ArtifactStore, file: &str) {
        match store.load() {
            Err(ArtifactError::Corrupt { path, .. }) => assert!(path.ends_with(file)),
            other => panic!("expected corrupt {file}, got {other:?}"),
        }
    }

    #[test]
    fn scaler_with_short_scale_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&trained_set()).unwrap();
        edit_payload(&dir.path().join(SCALER_FILE), |p| {
            p["scale"] = serde_json::json!([])
        });
        assert_corrupt(&store, SCALER_FILE);
    }

    #[test]
    fn scaler_with_zero_scale_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&trained_set()).unwrap();
        edit_payload(&dir.path().join(SCALER_FILE), |p| {
            p["scale"][0] = serde_json::json!(0.0)
        });
        assert_corrupt(&store, SCALER_FILE);
    }

    #[test]
    fn imputer_missing_a_mean_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&trained_set()).unwrap();
        edit_payload(&dir.path().join(IMPUTER_FILE), |p| {
            if let Some(means) = p["means"].as_array_mut() {
                means.pop();
            }
        });
        assert_corrupt(&store, IMPUTER_FILE);
    }

    #[test]
    fn model_with_wrong_class_count_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&trained_set()).unwrap();
        edit_payload(&dir.path().join(MODEL_FILE), |p| {
            p["n_classes"] = serde_json::json!(0)
        });
        assert_corrupt(&store, MODEL_FILE);
    }

    #[test]
    fn future_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&trained_set()).unwrap();
        let path = dir.path().join(IMPUTER_FILE);
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("\"version\":1", "\"version\":2")).unwrap();
        assert!(matches!(
            store.load(),
            Err(ArtifactError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn artifacts_from_different_runs_are_rejected() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let store_a = ArtifactStore::new(dir_a.path());
        let store_b = ArtifactStore::new(dir_b.path());

        let set = trained_set();
        store_a.save(&set).unwrap();
        store_b
            .save(&ArtifactSet {
                run_id: "run-b".to_string(),
                ..set
            })
            .unwrap();
        std::fs::copy(dir_b.path().join(MODEL_FILE), dir_a.path().join(MODEL_FILE)).unwrap();

        assert!(matches!(store_a.load(), Err(ArtifactError::Mismatched(_))));
    }

    #[test]
    fn misaligned_set_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let mut set = trained_set();
        set.scaler.feature_names.reverse();
        assert!(matches!(store.save(&set), Err(ArtifactError::Mismatched(_))));
        assert!(!store.exists());
    }
}
