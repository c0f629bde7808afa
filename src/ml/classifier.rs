//! Trained-model lifecycle: absent, trained, retrained, restored.

use thiserror::Error;

use super::{
    ClassModel, ClassifierKind, NearestCentroidModel, NearestNeighborModel, TrainError,
    TrainOptions,
};
use crate::corpus::TrainingCorpus;
use crate::features::FeatureVector;

/// Errors raised while classifying a single frame.
#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    /// No model has been trained or loaded yet.
    #[error("Classifier has no trained model")]
    ModelNotTrained,
    /// The frame does not have the model's vector length.
    #[error("Feature vector has {actual} values (expected {expected})")]
    InvalidFeatureLength { expected: usize, actual: usize },
}

/// A model produced by one `train` call, independent of the corpus it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainedModel {
    NearestNeighbor(NearestNeighborModel),
    NearestCentroid(NearestCentroidModel),
}

impl TrainedModel {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Self::NearestNeighbor(_) => ClassifierKind::NearestNeighbor,
            Self::NearestCentroid(_) => ClassifierKind::NearestCentroid,
        }
    }

    fn inner(&self) -> &dyn ClassModel {
        match self {
            Self::NearestNeighbor(model) => model,
            Self::NearestCentroid(model) => model,
        }
    }

    pub fn classes(&self) -> &[String] {
        self.inner().classes()
    }

    pub fn feature_len(&self) -> usize {
        self.inner().feature_len()
    }

    pub fn validate(&self) -> Result<(), String> {
        self.inner().validate()
    }

    /// Map a frame to one of the model's class names.
    pub fn classify(&self, features: &[f32]) -> Result<&str, ClassifyError> {
        let model = self.inner();
        if features.len() != model.feature_len() {
            return Err(ClassifyError::InvalidFeatureLength {
                expected: model.feature_len(),
                actual: features.len(),
            });
        }
        let idx = model.predict_class_index(features);
        Ok(model.classes()[idx].as_str())
    }
}

/// Train a model of `options.kind` from a snapshot of `corpus`.
pub fn train(corpus: &TrainingCorpus, options: &TrainOptions) -> Result<TrainedModel, TrainError> {
    options.check_cancelled()?;
    let model = match options.kind {
        ClassifierKind::NearestNeighbor => {
            TrainedModel::NearestNeighbor(NearestNeighborModel::train(corpus, options)?)
        }
        ClassifierKind::NearestCentroid => {
            TrainedModel::NearestCentroid(NearestCentroidModel::train(corpus, options)?)
        }
    };
    tracing::debug!(
        kind = model.kind().as_str(),
        examples = corpus.total(),
        "Trained classifier"
    );
    Ok(model)
}

/// Holds the active model, if any.
///
/// Later corpus edits never reach the model until `train` runs again.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    model: Option<TrainedModel>,
}

impl Classifier {
    pub fn untrained() -> Self {
        Self::default()
    }

    /// Retrain from `corpus`. The previous model survives a failed run.
    pub fn train(
        &mut self,
        corpus: &TrainingCorpus,
        options: &TrainOptions,
    ) -> Result<&TrainedModel, TrainError> {
        let model = train(corpus, options)?;
        Ok(&*self.model.insert(model))
    }

    /// Install a model restored from storage.
    pub fn set_model(&mut self, model: TrainedModel) {
        self.model = Some(model);
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<&str, ClassifyError> {
        self.model
            .as_ref()
            .ok_or(ClassifyError::ModelNotTrained)?
            .classify(features.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: &[&str] = &["neutral", "full", "empty"];

    fn corpus() -> TrainingCorpus {
        let mut corpus = TrainingCorpus::new(CLASSES, 3).unwrap();
        for (label, base) in [("neutral", 0.0f32), ("full", 1.0), ("empty", 2.0)] {
            for offset in [0.0f32, 0.1, 0.2] {
                corpus
                    .append(label, FeatureVector::from(vec![base + offset; 3]))
                    .unwrap();
            }
        }
        corpus
    }

    #[test]
    fn classify_before_training_fails() {
        let classifier = Classifier::untrained();
        let err = classifier
            .classify(&FeatureVector::from(vec![0.0; 3]))
            .unwrap_err();
        assert_eq!(err, ClassifyError::ModelNotTrained);
    }

    #[test]
    fn training_is_deterministic_for_every_kind() {
        let corpus = corpus();
        let queries: Vec<FeatureVector> = (0..25)
            .map(|i| FeatureVector::from(vec![i as f32 * 0.1, 0.5, i as f32 * 0.07]))
            .collect();
        for kind in [ClassifierKind::NearestNeighbor, ClassifierKind::NearestCentroid] {
            let options = TrainOptions::with_kind(kind);
            let mut first = Classifier::untrained();
            first.train(&corpus, &options).unwrap();
            let mut second = Classifier::untrained();
            second.train(&corpus, &options).unwrap();
            assert_eq!(first.model(), second.model());
            for query in &queries {
                assert_eq!(
                    first.classify(query).unwrap(),
                    second.classify(query).unwrap()
                );
            }
        }
    }

    #[test]
    fn corpus_edits_after_training_have_no_effect_until_retrained() {
        let mut corpus = TrainingCorpus::new(CLASSES, 1).unwrap();
        corpus.append("full", FeatureVector::from(vec![1.0])).unwrap();
        let mut classifier = Classifier::untrained();
        classifier
            .train(&corpus, &TrainOptions::default())
            .unwrap();
        let query = FeatureVector::from(vec![5.0]);
        assert_eq!(classifier.classify(&query).unwrap(), "full");

        corpus.append("empty", FeatureVector::from(vec![5.0])).unwrap();
        assert_eq!(classifier.classify(&query).unwrap(), "full");

        classifier
            .train(&corpus, &TrainOptions::default())
            .unwrap();
        assert_eq!(classifier.classify(&query).unwrap(), "empty");
    }

    #[test]
    fn failed_retrain_keeps_previous_model() {
        let mut classifier = Classifier::untrained();
        classifier
            .train(&corpus(), &TrainOptions::default())
            .unwrap();
        let before = classifier.model().cloned();

        let empty = TrainingCorpus::new(CLASSES, 3).unwrap();
        let err = classifier
            .train(&empty, &TrainOptions::default())
            .unwrap_err();
        assert_eq!(err, TrainError::EmptyCorpus);
        assert_eq!(classifier.model().cloned(), before);
    }

    #[test]
    fn cancelled_training_reports_cancellation() {
        let cancel = super::super::CancelFlag::new();
        cancel.cancel();
        let options = TrainOptions {
            kind: ClassifierKind::NearestNeighbor,
            cancel: Some(cancel),
        };
        let mut classifier = Classifier::untrained();
        let err = classifier.train(&corpus(), &options).unwrap_err();
        assert_eq!(err, TrainError::Cancelled);
        assert!(!classifier.is_trained());
    }

    #[test]
    fn classify_rejects_wrong_length() {
        let mut classifier = Classifier::untrained();
        classifier
            .train(&corpus(), &TrainOptions::default())
            .unwrap();
        let err = classifier
            .classify(&FeatureVector::from(vec![0.0; 2]))
            .unwrap_err();
        assert_eq!(
            err,
            ClassifyError::InvalidFeatureLength {
                expected: 3,
                actual: 2
            }
        );
    }
}
