use super::{ControllerError, ControllerEvent, SessionController};
use crate::ml::TrainOptions;
use crate::store::StoreError;

impl SessionController {
    pub(super) fn advance_class(&mut self) -> ControllerEvent {
        let classes = self.settings.class_names.len().max(1);
        self.class_index = (self.class_index + 1) % classes;
        tracing::info!(class = self.current_class(), "Collecting class");
        self.collecting_event()
    }

    pub(super) fn capture_sample(&mut self) -> Result<ControllerEvent, ControllerError> {
        let frame = self.latest_frame.clone().ok_or(ControllerError::NoFrame)?;
        let class = self.current_class().to_string();
        let count = self.corpus.append(&class, frame)?;
        tracing::debug!(class = %class, count, "Captured sample");
        Ok(ControllerEvent::Collecting { class, count })
    }

    pub(super) fn train(&mut self) -> Result<ControllerEvent, ControllerError> {
        self.cancel.reset();
        let options = TrainOptions {
            kind: self.settings.classifier,
            cancel: Some(self.cancel.clone()),
        };
        let kind = self.classifier.train(&self.corpus, &options)?.kind();
        self.cancel.reset();
        self.classifying = true;
        let examples = self.corpus.total();
        tracing::info!(kind = kind.as_str(), examples, "Classifier trained");
        Ok(ControllerEvent::Trained { kind, examples })
    }

    pub(super) fn toggle_recording(&mut self) -> ControllerEvent {
        if self.session.is_active() {
            let frames = self.session.len();
            let verdict = self.session.stop();
            tracing::info!(frames, verdict = ?verdict, "Recording stopped");
            ControllerEvent::Verdict(verdict)
        } else {
            self.session.start();
            tracing::info!("Recording started");
            ControllerEvent::RecordingStarted
        }
    }

    pub(super) fn resume_collecting(&mut self) -> ControllerEvent {
        if self.session.is_active() {
            tracing::info!("Recording abandoned");
        }
        self.session.abandon();
        self.classifying = false;
        self.collecting_event()
    }

    pub(super) fn save(&mut self, name: Option<String>) -> Result<ControllerEvent, ControllerError> {
        let (model_name, corpus_name) = self.artifact_names(name);
        let corpus = self.store.save_corpus(&self.corpus, &corpus_name)?;
        let model = match self.classifier.model() {
            Some(model) => Some(self.store.save_model(model, &model_name)?),
            None => None,
        };
        Ok(ControllerEvent::Saved { model, corpus })
    }

    /// Read both artifacts before touching live state so a failure changes nothing.
    ///
    /// The corpus is required; a missing model leaves the current classifier
    /// in place.
    pub(super) fn load(&mut self, name: Option<String>) -> Result<ControllerEvent, ControllerError> {
        let (model_name, corpus_name) = self.artifact_names(name);
        let corpus = self.store.load_corpus(&corpus_name)?;
        let model = match self.store.load_model(&model_name) {
            Ok(model) => Some(model),
            Err(StoreError::ModelNotFound { path }) => {
                tracing::info!(path = %path.display(), "No saved model, loading corpus only");
                None
            }
            Err(err) => return Err(err.into()),
        };

        self.corpus.replace(corpus)?;
        let has_model = model.is_some();
        if let Some(model) = model {
            self.classifier.set_model(model);
            self.session.abandon();
            self.classifying = true;
        }
        let examples = self.corpus.total();
        Ok(ControllerEvent::Loaded {
            name: corpus_name,
            examples,
            model: has_model,
        })
    }

    fn artifact_names(&self, name: Option<String>) -> (String, String) {
        match name {
            Some(name) => (name.clone(), name),
            None => (
                self.settings.model_name.clone(),
                self.settings.corpus_name.clone(),
            ),
        }
    }
}
