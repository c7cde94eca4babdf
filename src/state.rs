use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{AppSettings, TrainConfig};
use crate::data::cache::{DatasetCache, LoadedDataset};
use crate::data::source::DataSource;
use crate::ml::pipeline::train_and_persist;
use crate::ml::{
    ArtifactStore, EvaluationReport, InferenceEngine, Prediction, PredictionRequest, TrainingStage,
};

/// Rows shown in the dataset preview.
pub const PREVIEW_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Info(String),
    Error(String),
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: AppSettings,
    pub cache: DatasetCache,
    pub store: ArtifactStore,

    /// File picked via File → Open…; takes precedence over the default dataset.
    pub uploaded: Option<PathBuf>,
    /// Whether to fall back to the bundled NASA export.
    pub use_default: bool,
    /// Active dataset (None until a source resolves).
    pub dataset: Option<LoadedDataset>,

    /// Hyperparameters from the side panel.
    pub config: TrainConfig,
    /// Results of the last training run in this session.
    pub report: Option<EvaluationReport>,
    /// Stages the last training run went through.
    pub progress: Vec<TrainingStage>,

    /// Loaded model, present whenever a complete artifact set is available.
    pub engine: Option<InferenceEngine>,
    /// Prediction form values, keyed by feature name.
    pub inputs: BTreeMap<String, f64>,
    pub prediction: Option<Prediction>,

    pub status: Option<Status>,
}

impl AppState {
    pub fn new(settings: AppSettings) -> Self {
        let store = ArtifactStore::new(settings.artifact_dir.clone());
        let use_default = settings.default_dataset.exists();
        let mut state = Self {
            settings,
            cache: DatasetCache::default(),
            store,
            uploaded: None,
            use_default,
            dataset: None,
            config: TrainConfig::default(),
            report: None,
            progress: Vec::new(),
            engine: None,
            inputs: BTreeMap::new(),
            prediction: None,
            status: None,
        };
        // A model load error must outlive the dataset's info status.
        state.reload_dataset();
        state.refresh_engine();
        state
    }

    pub fn source(&self) -> Option<DataSource> {
        DataSource::resolve(
            self.uploaded.as_deref(),
            self.use_default,
            &self.settings.default_dataset,
        )
    }

    /// Ingest a file chosen by the user.
    pub fn select_upload(&mut self, path: PathBuf) {
        self.uploaded = Some(path);
        self.reload_dataset();
    }

    pub fn set_use_default(&mut self, use_default: bool) {
        self.use_default = use_default;
        self.reload_dataset();
    }

    /// Resolve the active source and load it through the cache.
    pub fn reload_dataset(&mut self) {
        let Some(source) = self.source() else {
            self.dataset = None;
            return;
        };
        match self.cache.load(&source) {
            Ok(dataset) => {
                if self.dataset.as_ref().map(|d| d.hash) != Some(dataset.hash) {
                    self.report = None;
                    self.progress.clear();
                }
                self.status = Some(Status::Info(format!(
                    "Dataset loaded with {} rows and {} columns.",
                    dataset.table.n_rows(),
                    dataset.table.n_cols()
                )));
                self.dataset = Some(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", source.label());
                self.status = Some(Status::Error(format!("Error: {e:#}")));
                self.dataset = None;
            }
        }
    }

    /// Reload the persisted model, if a complete set exists.
    pub fn refresh_engine(&mut self) {
        if !self.store.exists() {
            self.engine = None;
            return;
        }
        match InferenceEngine::load(&self.store) {
            Ok(engine) => self.install_engine(engine),
            Err(e) => {
                log::warn!("{e}");
                self.engine = None;
                self.status = Some(Status::Error(e.to_string()));
            }
        }
    }

    fn install_engine(&mut self, engine: InferenceEngine) {
        let mut inputs = BTreeMap::new();
        for name in engine.feature_names() {
            let previous = self.inputs.get(name).copied().unwrap_or(0.0);
            inputs.insert(name.clone(), previous);
        }
        self.inputs = inputs;
        self.prediction = None;
        self.engine = Some(engine);
    }

    /// Preprocess, train, evaluate and persist on the active dataset.
    /// Blocks until the run completes.
    pub fn train(&mut self) {
        let Some(dataset) = self.dataset.clone() else {
            self.status = Some(Status::Error("Load a dataset before training.".to_string()));
            return;
        };

        let mut progress = vec![TrainingStage::Preprocessing];
        log::info!("{}", TrainingStage::Preprocessing);
        let result = self.cache.preprocessed(&dataset).and_then(|prepared| {
            train_and_persist(
                &prepared,
                &dataset.hash,
                &self.config,
                &self.store,
                &mut |stage| {
                    log::info!("{stage}");
                    progress.push(stage);
                },
            )
        });
        self.progress = progress;

        match result {
            Ok((report, set)) => {
                self.status = Some(Status::Info(format!(
                    "Model training complete! Accuracy {:.4}",
                    report.accuracy
                )));
                self.report = Some(report);
                self.install_engine(InferenceEngine::new(set));
            }
            Err(e) => {
                log::error!("Training failed: {e:#}");
                self.status = Some(Status::Error(e.to_string()));
            }
        }
    }

    /// Classify the current form values.
    pub fn predict(&mut self) {
        let Some(engine) = &self.engine else {
            self.status = Some(Status::Error(
                "Please upload a dataset and train a model to enable predictions.".to_string(),
            ));
            return;
        };
        let mut request = PredictionRequest::new();
        for (name, value) in &self.inputs {
            request.set(name.as_str(), *value);
        }
        match engine.predict(&request) {
            Ok(prediction) => self.prediction = Some(prediction),
            Err(e) => {
                log::warn!("Prediction rejected: {e}");
                self.prediction = None;
                self.status = Some(Status::Error(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use super::*;

    fn write_koi_csv(path: &std::path::Path, n: usize) {
        let mut csv = String::from("kepid,koi_disposition,koi_period,koi_period_err1,koi_depth\n");
        for i in 0..n {
            let candidate = i % 2 == 1;
            let disposition = if candidate { "CANDIDATE" } else { "CONFIRMED" };
            let base = if candidate { 40.0 } else { 4.0 };
            let period = base + (i % 5) as f64;
            let depth = if i % 9 == 0 { String::new() } else { format!("{}", 200 + i % 11) };
            writeln!(csv, "{i},{disposition},{period},0.01,{depth}").unwrap();
        }
        writeln!(csv, "999,FALSE POSITIVE,1.0,0.01,5").unwrap();
        std::fs::write(path, csv).unwrap();
    }

    fn state_in(dir: &std::path::Path) -> AppState {
        let mut state = AppState::new(AppSettings {
            artifact_dir: dir.join("artifacts"),
            default_dataset: dir.join("missing_default.csv"),
        });
        state.config = TrainConfig {
            n_trees: 100,
            max_depth: 5,
            test_size: 0.3,
            seed: 42,
        };
        state
    }

    #[test]
    fn upload_train_predict_flow() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("koi.csv");
        write_koi_csv(&csv, 60);

        let mut state = state_in(dir.path());
        assert!(state.dataset.is_none());
        assert!(state.engine.is_none());

        state.select_upload(csv);
        assert_eq!(state.dataset.as_ref().unwrap().table.n_rows(), 61);

        state.train();
        let report = state.report.as_ref().expect("training report");
        assert_eq!(report.confusion.total() as usize, report.n_test);
        assert_eq!(state.progress.first(), Some(&TrainingStage::Preprocessing));
        assert_eq!(state.progress.last(), Some(&TrainingStage::Persisting));
        assert_eq!(
            state.inputs.keys().cloned().collect::<Vec<_>>(),
            vec!["koi_depth", "koi_period"]
        );

        state.inputs.insert("koi_period".to_string(), 42.0);
        state.inputs.insert("koi_depth".to_string(), 205.0);
        state.predict();
        assert_eq!(state.prediction.as_ref().unwrap().class.index(), 1);

        // A fresh session picks up the persisted model.
        let reopened = state_in(dir.path());
        assert!(reopened.engine.is_some());
    }

    #[test]
    fn corrupt_artifacts_are_reported_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let default_csv = dir.path().join("default.csv");
        write_koi_csv(&default_csv, 20);
        let artifact_dir = dir.path().join("artifacts");
        std::fs::create_dir_all(&artifact_dir).unwrap();
        for name in ["imputer.json", "scaler.json", "model.json"] {
            std::fs::write(artifact_dir.join(name), "{}").unwrap();
        }

        let state = AppState::new(AppSettings {
            artifact_dir,
            default_dataset: default_csv,
        });
        assert!(state.dataset.is_some());
        assert!(state.engine.is_none());
        match &state.status {
            Some(Status::Error(msg)) => assert!(msg.contains("No trained model available")),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn predict_without_model_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        state.predict();
        assert!(matches!(state.status, Some(Status::Error(_))));
    }

    #[test]
    fn missing_target_surfaces_as_error_and_keeps_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("no_target.csv");
        std::fs::write(&csv, "koi_period,koi_depth\n1.0,2.0\n").unwrap();

        let mut state = state_in(dir.path());
        state.select_upload(csv);
        state.train();
        assert!(state.report.is_none());
        assert!(!state.store.exists());
        match &state.status {
            Some(Status::Error(msg)) => assert!(msg.contains("koi_disposition")),
            other => panic!("unexpected status {other:?}"),
        }
    }
}
