//! Labeled training corpus grouped by class.
//!
//! The bucket set always matches the configured class names exactly: every
//! class has a bucket (possibly empty) and no other label can be stored.
//! Buckets keep the configured class order, and examples keep insertion order
//! inside a bucket. Training and nearest-match tie-breaking rely on that order.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::features::{FeatureVector, LabeledExample, UNLABELED};

/// Errors raised by corpus mutations.
#[derive(Debug, Error, PartialEq)]
pub enum CorpusError {
    /// The label is not one of the configured classes.
    #[error("Label {label:?} is not a configured class")]
    InvalidLabel { label: String },
    /// A feature vector does not have the configured length.
    #[error("Feature vector has {actual} values (expected {expected})")]
    InvalidFeatureLength { expected: usize, actual: usize },
    /// A replacement corpus covers a different class set or vector length.
    #[error("Corpus schema mismatch: expected classes {expected:?} with {expected_len} values, found {found:?} with {found_len} values")]
    SchemaMismatch {
        expected: Vec<String>,
        expected_len: usize,
        found: Vec<String>,
        found_len: usize,
    },
    /// The class list is empty, repeats a name, or uses a reserved name.
    #[error("Invalid class set: {0}")]
    InvalidClassSet(String),
}

/// Examples captured for one class, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassBucket {
    label: String,
    examples: Vec<LabeledExample>,
}

impl ClassBucket {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }
}

/// Mapping from class label to the examples collected for it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingCorpus {
    feature_len: usize,
    buckets: Vec<ClassBucket>,
}

impl TrainingCorpus {
    /// Create an empty corpus with one bucket per class.
    pub fn new<S: AsRef<str>>(class_names: &[S], feature_len: usize) -> Result<Self, CorpusError> {
        let mut corpus = Self {
            feature_len,
            buckets: Vec::new(),
        };
        corpus.reset(class_names)?;
        Ok(corpus)
    }

    /// Replace every bucket with an empty one keyed by `class_names`.
    pub fn reset<S: AsRef<str>>(&mut self, class_names: &[S]) -> Result<(), CorpusError> {
        validate_class_names(class_names)?;
        self.buckets = class_names
            .iter()
            .map(|name| ClassBucket {
                label: name.as_ref().to_string(),
                examples: Vec::new(),
            })
            .collect();
        Ok(())
    }

    /// Append a captured frame under `label`, returning the new bucket size.
    pub fn append(&mut self, label: &str, features: FeatureVector) -> Result<usize, CorpusError> {
        if features.len() != self.feature_len {
            return Err(CorpusError::InvalidFeatureLength {
                expected: self.feature_len,
                actual: features.len(),
            });
        }
        let bucket = self
            .buckets
            .iter_mut()
            .find(|bucket| bucket.label == label)
            .ok_or_else(|| CorpusError::InvalidLabel {
                label: label.to_string(),
            })?;
        bucket.examples.push(LabeledExample::new(label, features));
        Ok(bucket.examples.len())
    }

    /// Number of examples collected for `label`; zero for unknown labels.
    pub fn count_for(&self, label: &str) -> usize {
        self.bucket(label)
            .map(|bucket| bucket.examples.len())
            .unwrap_or(0)
    }

    /// Swap in `other` wholesale if it covers the same classes and vector length.
    ///
    /// Buckets are reordered to the configured class order. On error `self` is
    /// left unchanged.
    pub fn replace(&mut self, other: TrainingCorpus) -> Result<(), CorpusError> {
        self.check_schema(&other)?;
        let mut incoming = other.buckets;
        let mut buckets = Vec::with_capacity(self.buckets.len());
        for current in &self.buckets {
            let idx = incoming
                .iter()
                .position(|bucket| bucket.label == current.label)
                .ok_or_else(|| self.mismatch(other.feature_len, &[]))?;
            buckets.push(incoming.swap_remove(idx));
        }
        self.buckets = buckets;
        Ok(())
    }

    /// Ensure `other` has the same class set and vector length as `self`.
    pub fn check_schema(&self, other: &TrainingCorpus) -> Result<(), CorpusError> {
        let ours: BTreeSet<&str> = self.class_names().collect();
        let theirs: BTreeSet<&str> = other.class_names().collect();
        if ours != theirs || self.feature_len != other.feature_len {
            let found: Vec<String> = other.class_names().map(str::to_string).collect();
            return Err(self.mismatch(other.feature_len, &found));
        }
        Ok(())
    }

    fn mismatch(&self, found_len: usize, found: &[String]) -> CorpusError {
        CorpusError::SchemaMismatch {
            expected: self.class_names().map(str::to_string).collect(),
            expected_len: self.feature_len,
            found: found.to_vec(),
            found_len,
        }
    }

    /// Configured class names in order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|bucket| bucket.label.as_str())
    }

    /// Buckets in configured class order.
    pub fn buckets(&self) -> &[ClassBucket] {
        &self.buckets
    }

    pub fn bucket(&self, label: &str) -> Option<&ClassBucket> {
        self.buckets.iter().find(|bucket| bucket.label == label)
    }

    /// All examples, class by class, each class in insertion order.
    pub fn examples(&self) -> impl Iterator<Item = &LabeledExample> {
        self.buckets.iter().flat_map(|bucket| bucket.examples.iter())
    }

    /// Total number of examples across classes.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.examples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn feature_len(&self) -> usize {
        self.feature_len
    }
}

pub(crate) fn validate_class_names<S: AsRef<str>>(class_names: &[S]) -> Result<(), CorpusError> {
    if class_names.is_empty() {
        return Err(CorpusError::InvalidClassSet(
            "at least one class is required".to_string(),
        ));
    }
    let mut seen = BTreeSet::new();
    for name in class_names.iter().map(|name| name.as_ref()) {
        if name.trim().is_empty() {
            return Err(CorpusError::InvalidClassSet(
                "class names must not be blank".to_string(),
            ));
        }
        if name == UNLABELED {
            return Err(CorpusError::InvalidClassSet(format!(
                "{UNLABELED:?} is reserved"
            )));
        }
        if !seen.insert(name) {
            return Err(CorpusError::InvalidClassSet(format!(
                "duplicate class {name:?}"
            )));
        }
    }
    Ok(())
}
