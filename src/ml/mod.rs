//! Training and inference pipeline.
//!
//! ```text
//!  RawTable ─► preprocess ─► train_and_evaluate ─► ArtifactStore::save
//!                                                        │
//!  PredictionRequest ─► InferenceEngine ◄─ ArtifactStore::load
//! ```

pub mod artifacts;
pub mod error;
pub mod forest;
pub mod inference;
pub mod matrix;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod scaler;
pub mod split;
pub mod train;

pub use artifacts::ArtifactStore;
pub use error::PipelineError;
pub use inference::{InferenceEngine, Prediction, PredictionRequest};
pub use preprocess::{PreparedData, preprocess};
pub use train::{EvaluationReport, TrainingStage};
