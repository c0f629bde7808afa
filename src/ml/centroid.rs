//! Nearest-centroid classifier: one mean vector per class with examples.

use super::{ClassModel, TrainError, TrainOptions, closest_row};
use crate::corpus::TrainingCorpus;

#[derive(Debug, Clone, PartialEq)]
pub struct NearestCentroidModel {
    pub classes: Vec<String>,
    pub feature_len: usize,
    /// Shape: `[centroids][feature_len]`, in configured class order.
    pub centroids: Vec<f32>,
    /// Class index for each centroid. Classes without examples have none.
    pub centroid_labels: Vec<usize>,
}

impl NearestCentroidModel {
    pub(crate) fn train(
        corpus: &TrainingCorpus,
        options: &TrainOptions,
    ) -> Result<Self, TrainError> {
        if corpus.is_empty() {
            return Err(TrainError::EmptyCorpus);
        }
        let dim = corpus.feature_len();
        let mut centroids = Vec::new();
        let mut centroid_labels = Vec::new();
        let mut seen = 0;
        for (class_idx, bucket) in corpus.buckets().iter().enumerate() {
            if bucket.examples().is_empty() {
                continue;
            }
            // Accumulate in f64; the mean is rounded once.
            let mut sum = vec![0.0f64; dim];
            for example in bucket.examples() {
                options.check_cancelled_at(seen)?;
                seen += 1;
                for (acc, &value) in sum.iter_mut().zip(example.features().as_slice()) {
                    *acc += f64::from(value);
                }
            }
            let n = bucket.examples().len() as f64;
            centroids.extend(sum.into_iter().map(|acc| (acc / n) as f32));
            centroid_labels.push(class_idx);
        }
        let model = Self {
            classes: corpus.class_names().map(str::to_string).collect(),
            feature_len: dim,
            centroids,
            centroid_labels,
        };
        model.validate().map_err(TrainError::InvalidModel)?;
        Ok(model)
    }
}

impl ClassModel for NearestCentroidModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn feature_len(&self) -> usize {
        self.feature_len
    }

    fn predict_class_index(&self, features: &[f32]) -> usize {
        closest_row(&self.centroids, self.feature_len, features)
            .map(|row| self.centroid_labels[row])
            .unwrap_or(0)
    }

    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("No classes defined".to_string());
        }
        if self.feature_len == 0 {
            return Err("feature_len must be > 0".to_string());
        }
        if self.centroid_labels.is_empty() {
            return Err("No centroids".to_string());
        }
        if self.centroids.len() != self.centroid_labels.len() * self.feature_len {
            return Err("centroids length mismatch".to_string());
        }
        if self
            .centroid_labels
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err("centroid labels must be strictly increasing".to_string());
        }
        if self
            .centroid_labels
            .last()
            .is_some_and(|&label| label >= self.classes.len())
        {
            return Err("centroid label out of range".to_string());
        }
        Ok(())
    }
}
