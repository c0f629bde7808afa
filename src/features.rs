//! Feature vectors and labeled examples.

use std::sync::Arc;

/// Label attached to a frame that is being classified rather than collected.
///
/// Never stored in a corpus and rejected as a configured class name.
pub const UNLABELED: &str = "unlabeled";

/// Immutable per-frame spectral magnitudes.
///
/// Each frame is copied out of the producer's buffer, so a vector never
/// aliases memory that is overwritten on the next frame. Clones share the
/// same allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Arc<[f32]>);

impl FeatureVector {
    /// Copy a frame out of a live buffer.
    pub fn from_frame(frame: &[f32]) -> Self {
        Self(Arc::from(frame))
    }

    /// Borrow the magnitudes.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of magnitudes in the vector.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the vector holds no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Squared Euclidean distance to another slice of the same length.
    pub fn squared_distance(&self, other: &[f32]) -> f32 {
        squared_distance(&self.0, other)
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(Arc::from(values))
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// A feature vector tagged with the class it was captured under.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    label: String,
    features: FeatureVector,
}

impl LabeledExample {
    pub(crate) fn new(label: impl Into<String>, features: FeatureVector) -> Self {
        Self {
            label: label.into(),
            features,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn features(&self) -> &FeatureVector {
        &self.features
    }
}

pub(crate) fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
