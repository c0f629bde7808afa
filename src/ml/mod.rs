//! Classifier training and inference over collected feature vectors.
//!
//! Algorithms are pluggable behind [`ClassifierKind`]; every model maps a
//! feature vector to one of the configured class names and breaks distance
//! ties in corpus order (configured class order, then insertion order).

pub mod centroid;
pub mod classifier;
pub mod metrics;
pub mod nearest;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use centroid::NearestCentroidModel;
pub use classifier::{Classifier, ClassifyError, TrainedModel, train};
pub use nearest::NearestNeighborModel;

/// Learning algorithm used by `train`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// 1-nearest-neighbor over every stored example.
    #[default]
    NearestNeighbor,
    /// Nearest per-class mean vector.
    NearestCentroid,
}

impl ClassifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NearestNeighbor => "nearest_neighbor",
            Self::NearestCentroid => "nearest_centroid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "nearest_neighbor" | "knn" | "nn" => Some(Self::NearestNeighbor),
            "nearest_centroid" | "centroid" => Some(Self::NearestCentroid),
            _ => None,
        }
    }
}

/// Errors raised while training a model.
#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
    /// No class has any example to learn from.
    #[error("Cannot train on an empty corpus")]
    EmptyCorpus,
    /// Training was interrupted through its cancel flag.
    #[error("Training cancelled")]
    Cancelled,
    /// The produced model failed structural validation.
    #[error("Trained model is invalid: {0}")]
    InvalidModel(String),
}

/// Shared flag that interrupts an in-flight training run.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Examples processed between cancel flag polls.
pub(crate) const CANCEL_CHECK_INTERVAL: usize = 64;

/// Options for a single training run.
#[derive(Debug, Clone, Default)]
pub struct TrainOptions {
    pub kind: ClassifierKind,
    pub cancel: Option<CancelFlag>,
}

impl TrainOptions {
    pub fn with_kind(kind: ClassifierKind) -> Self {
        Self { kind, cancel: None }
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), TrainError> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(TrainError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Poll the cancel flag once every [`CANCEL_CHECK_INTERVAL`] examples.
    pub(crate) fn check_cancelled_at(&self, example_index: usize) -> Result<(), TrainError> {
        if example_index % CANCEL_CHECK_INTERVAL == 0 {
            self.check_cancelled()
        } else {
            Ok(())
        }
    }
}

/// Shared inference surface of every model.
pub trait ClassModel {
    /// Ordered class names the model can emit.
    fn classes(&self) -> &[String];

    /// Number of values per feature vector.
    fn feature_len(&self) -> usize;

    /// Index into [`ClassModel::classes`] of the best match.
    ///
    /// Callers guarantee `features.len() == self.feature_len()`.
    fn predict_class_index(&self, features: &[f32]) -> usize;

    /// Check structural invariants.
    fn validate(&self) -> Result<(), String>;
}

/// Scan flattened rows and return the index of the closest one.
///
/// Strict `<` keeps the earliest row on equal distance. Returns `None` only
/// when there are no rows.
pub(crate) fn closest_row(rows: &[f32], dim: usize, features: &[f32]) -> Option<usize> {
    if dim == 0 {
        return None;
    }
    let mut best: Option<(usize, f32)> = None;
    for (idx, row) in rows.chunks_exact(dim).enumerate() {
        let dist = crate::features::squared_distance(row, features);
        match best {
            None => best = Some((idx, dist)),
            Some((_, best_dist)) if dist < best_dist => best = Some((idx, dist)),
            _ => {}
        }
    }
    best.map(|(idx, _)| idx)
}
