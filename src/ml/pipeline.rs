//! End-to-end training run: preprocessed data → fitted artifacts on disk.

use super::artifacts::{ArtifactSet, ArtifactStore};
use super::error::PipelineError;
use super::preprocess::PreparedData;
use super::train::{EvaluationReport, TrainingStage, train_and_evaluate};
use crate::config::TrainConfig;
use crate::data::cache::ContentHash;

/// Id tying the three artifacts of one run together.
pub fn run_id(dataset: &ContentHash, config: &TrainConfig, feature_names: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"exodetect-run-v1|");
    hasher.update(dataset.to_hex().as_bytes());
    hasher.update(
        format!(
            "|{}|{}|{}|{}|",
            config.n_trees, config.max_depth, config.test_size, config.seed
        )
        .as_bytes(),
    );
    for name in feature_names {
        hasher.update(name.as_bytes());
        hasher.update(b",");
    }
    hasher.finalize().to_hex().to_string()
}

/// Train on prepared data and persist the matched artifact set.
///
/// Nothing is written unless training and evaluation succeed.
pub fn train_and_persist(
    prepared: &PreparedData,
    dataset: &ContentHash,
    config: &TrainConfig,
    store: &ArtifactStore,
    observer: &mut dyn FnMut(TrainingStage),
) -> Result<(EvaluationReport, ArtifactSet), PipelineError> {
    let outcome = train_and_evaluate(
        &prepared.features,
        &prepared.target,
        &prepared.feature_names,
        config,
        &mut *observer,
    )?;

    observer(TrainingStage::Persisting);
    let set = ArtifactSet {
        run_id: run_id(dataset, config, &prepared.feature_names),
        imputer: prepared.imputer.clone(),
        scaler: outcome.scaler,
        model: outcome.model,
    };
    store.save(&set)?;
    Ok((outcome.report, set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, RawTable};
    use crate::ml::inference::{InferenceEngine, PredictionRequest};
    use crate::ml::preprocess::preprocess;

    fn koi_table(n: usize) -> RawTable {
        let mut disposition = Vec::with_capacity(n);
        let mut period = Vec::with_capacity(n);
        let mut depth = Vec::with_capacity(n);
        let mut kepid = Vec::with_capacity(n);
        for i in 0..n {
            let candidate = i % 2 == 1;
            let label = if candidate { "CANDIDATE" } else { "CONFIRMED" };
            disposition.push(Some(label.to_string()));
            let base = if candidate { 30.0 } else { 5.0 };
            period.push(base + (i % 7) as f64);
            depth.push(if i % 10 == 0 { f64::NAN } else { 100.0 + (i % 13) as f64 * 10.0 });
            kepid.push(i as f64);
        }
        RawTable::from_columns(vec![
            Column::numeric("kepid", kepid),
            Column::text("koi_disposition", disposition),
            Column::numeric("koi_period", period),
            Column::numeric("koi_depth", depth),
        ])
        .unwrap()
    }

    fn config() -> TrainConfig {
        TrainConfig {
            n_trees: 100,
            max_depth: 5,
            test_size: 0.3,
            seed: 42,
        }
    }

    #[test]
    fn trained_run_is_usable_for_inference() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let prepared = preprocess(&koi_table(100)).unwrap();
        let hash = ContentHash::of(b"koi_table(100)");

        let mut stages = Vec::new();
        let (report, set) =
            train_and_persist(&prepared, &hash, &config(), &store, &mut |s| stages.push(s))
                .unwrap();
        assert_eq!(stages.last(), Some(&TrainingStage::Persisting));
        assert_eq!(report.confusion.total(), 30);
        assert!(store.exists());

        let engine = InferenceEngine::load(&store).unwrap();
        assert_eq!(engine.run_id(), set.run_id);
        let prediction = engine
            .predict(
                &PredictionRequest::new()
                    .with("koi_period", 33.0)
                    .with("koi_depth", 150.0),
            )
            .unwrap();
        assert_eq!(prediction.class.index(), 1);
    }

    #[test]
    fn failed_training_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let prepared = preprocess(&koi_table(100)).unwrap();
        let bad = TrainConfig {
            test_size: 0.95,
            ..config()
        };
        let hash = ContentHash::of(b"x");
        let result = train_and_persist(&prepared, &hash, &bad, &store, &mut |_| {});
        assert!(result.is_err());
        assert!(!store.exists());
    }

    #[test]
    fn run_id_depends_on_data_config_and_features() {
        let names = vec!["koi_period".to_string()];
        let a = run_id(&ContentHash::of(b"a"), &config(), &names);
        assert_eq!(a, run_id(&ContentHash::of(b"a"), &config(), &names));
        assert_ne!(a, run_id(&ContentHash::of(b"b"), &config(), &names));
        assert_ne!(
            a,
            run_id(
                &ContentHash::of(b"a"),
                &TrainConfig {
                    n_trees: 200,
                    ..config()
                },
                &names
            )
        );
    }
}
