//! 1-nearest-neighbor classifier over stored examples.

use super::{ClassModel, TrainError, TrainOptions, closest_row};
use crate::corpus::TrainingCorpus;

/// Every training example, flattened row-major for a single linear scan.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestNeighborModel {
    pub classes: Vec<String>,
    pub feature_len: usize,
    /// Shape: `[rows][feature_len]`, in corpus order.
    pub rows: Vec<f32>,
    /// Class index for each row.
    pub row_labels: Vec<usize>,
}

impl NearestNeighborModel {
    pub(crate) fn train(
        corpus: &TrainingCorpus,
        options: &TrainOptions,
    ) -> Result<Self, TrainError> {
        if corpus.is_empty() {
            return Err(TrainError::EmptyCorpus);
        }
        let dim = corpus.feature_len();
        let total = corpus.total();
        let mut rows = Vec::with_capacity(total * dim);
        let mut row_labels = Vec::with_capacity(total);
        let mut seen = 0;
        for (class_idx, bucket) in corpus.buckets().iter().enumerate() {
            for example in bucket.examples() {
                options.check_cancelled_at(seen)?;
                seen += 1;
                rows.extend_from_slice(example.features().as_slice());
                row_labels.push(class_idx);
            }
        }
        let model = Self {
            classes: corpus.class_names().map(str::to_string).collect(),
            feature_len: dim,
            rows,
            row_labels,
        };
        model.validate().map_err(TrainError::InvalidModel)?;
        Ok(model)
    }

    pub fn row_count(&self) -> usize {
        self.row_labels.len()
    }
}

impl ClassModel for NearestNeighborModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn feature_len(&self) -> usize {
        self.feature_len
    }

    fn predict_class_index(&self, features: &[f32]) -> usize {
        closest_row(&self.rows, self.feature_len, features)
            .map(|row| self.row_labels[row])
            .unwrap_or(0)
    }

    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("No classes defined".to_string());
        }
        if self.feature_len == 0 {
            return Err("feature_len must be > 0".to_string());
        }
        if self.row_labels.is_empty() {
            return Err("No stored examples".to_string());
        }
        if self.rows.len() != self.row_labels.len() * self.feature_len {
            return Err("rows length mismatch".to_string());
        }
        if self.row_labels.iter().any(|&label| label >= self.classes.len()) {
            return Err("row label out of range".to_string());
        }
        Ok(())
    }
}
