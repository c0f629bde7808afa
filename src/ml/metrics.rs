//! Evaluation metrics for trained classifiers.

use super::{TrainError, TrainOptions, train};
use crate::corpus::TrainingCorpus;

#[derive(Debug, Clone, PartialEq)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| v as u64).sum()
    }
}

#[derive(Debug, Clone)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

impl PerClassStats {
    pub fn f1(&self) -> f32 {
        if self.precision + self.recall == 0.0 {
            0.0
        } else {
            2.0 * self.precision * self.recall / (self.precision + self.recall)
        }
    }
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    (0..k)
        .map(|class_idx| {
            let tp = cm.get(class_idx, class_idx) as f32;
            let support: u32 = (0..k).map(|j| cm.get(class_idx, j)).sum();
            let fn_ = support as f32 - tp;
            let fp: f32 = (0..k)
                .filter(|&i| i != class_idx)
                .map(|i| cm.get(i, class_idx) as f32)
                .sum();
            PerClassStats {
                precision: if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) },
                recall: if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) },
                support,
            }
        })
        .collect()
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = (0..cm.n_classes).map(|i| cm.get(i, i) as u64).sum();
    correct as f32 / total as f32
}

/// Leave-one-out evaluation: each example is classified by a model trained
/// on every other example.
///
/// Examples whose removal leaves the corpus empty are skipped.
pub fn leave_one_out(
    corpus: &TrainingCorpus,
    options: &TrainOptions,
) -> Result<ConfusionMatrix, TrainError> {
    let classes: Vec<&str> = corpus.class_names().collect();
    let mut cm = ConfusionMatrix::new(classes.len());
    let all: Vec<_> = corpus.examples().collect();
    for (held_out, example) in all.iter().enumerate() {
        let mut rest = TrainingCorpus::new(classes.as_slice(), corpus.feature_len())
            .map_err(|err| TrainError::InvalidModel(err.to_string()))?;
        for (idx, other) in all.iter().enumerate() {
            if idx != held_out {
                rest.append(other.label(), other.features().clone())
                    .map_err(|err| TrainError::InvalidModel(err.to_string()))?;
            }
        }
        let model = match train(&rest, options) {
            Ok(model) => model,
            Err(TrainError::EmptyCorpus) => continue,
            Err(err) => return Err(err),
        };
        let Ok(predicted) = model.classify(example.features().as_slice()) else {
            continue;
        };
        let truth = classes.iter().position(|&c| c == example.label());
        let predicted = classes.iter().position(|&c| c == predicted);
        if let (Some(truth), Some(predicted)) = (truth, predicted) {
            cm.add(truth, predicted);
        }
    }
    Ok(cm)
}
