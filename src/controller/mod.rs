//! Mode state machine that routes frames and operator commands.
//!
//! The controller starts out collecting examples for the first configured
//! class. `Train` (or a `Load` that restores a model) switches it to
//! classifying, where every frame is classified and, while recording, fed into
//! the active [`ClassificationSession`]. `ResumeCollecting` goes back to
//! collecting without discarding the model.

mod commands;


use std::path::PathBuf;

use thiserror::Error;

use crate::config::Settings;
use crate::corpus::{CorpusError, TrainingCorpus};
use crate::features::FeatureVector;
use crate::ml::{CancelFlag, Classifier, ClassifierKind, ClassifyError, TrainError};
use crate::session::{ClassificationSession, SessionError};
use crate::store::{PersistenceStore, StoreError};

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Captured frames are stored under the class at `class_index`.
    Collecting { class_index: usize },
    /// Frames are classified by the active model.
    Classifying,
}

/// Operator commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AdvanceClass,
    CaptureSample,
    Train,
    ToggleRecording,
    ResumeCollecting,
    /// Save the model and corpus; `None` uses the configured names.
    Save(Option<String>),
    /// Load the model and corpus; `None` uses the configured names.
    Load(Option<String>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AdvanceClass => "advance_class",
            Self::CaptureSample => "capture_sample",
            Self::Train => "train",
            Self::ToggleRecording => "toggle_recording",
            Self::ResumeCollecting => "resume_collecting",
            Self::Save(_) => "save",
            Self::Load(_) => "load",
        }
    }
}

/// Something worth reporting back to the operator.
#[derive(Debug)]
pub enum ControllerEvent {
    /// Current class under edit and how many examples it holds.
    Collecting { class: String, count: usize },
    /// A frame was classified.
    Classified { label: String },
    RecordingStarted,
    /// Recording stopped; `None` when nothing was classified.
    Verdict(Option<String>),
    Trained {
        kind: ClassifierKind,
        examples: usize,
    },
    Saved {
        model: Option<PathBuf>,
        corpus: PathBuf,
    },
    Loaded {
        name: String,
        examples: usize,
        model: bool,
    },
    /// The command has no meaning in the current mode.
    Ignored { command: &'static str, mode: Mode },
    /// The command failed; controller state is unchanged.
    Error(ControllerError),
}

/// Errors raised while handling frames and commands.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Frame has {actual} values (expected {expected})")]
    InvalidFeatureLength { expected: usize, actual: usize },
    /// `CaptureSample` arrived before any frame.
    #[error("No frame has been received yet")]
    NoFrame,
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Classifying a well-formed frame failed even though a model is active.
    #[error("Classification failed with an active model: {0}")]
    Classification(ClassifyError),
}

impl ControllerError {
    /// True for errors that mean the engine can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Classification(_))
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub mode: Mode,
    /// Class under edit; kept while classifying so collecting resumes there.
    pub class: String,
    pub count: usize,
    pub total_examples: usize,
    pub last_label: Option<String>,
    pub recording: bool,
    pub trained: bool,
}

/// Owns the corpus, classifier and session, and applies frames and commands.
pub struct SessionController {
    settings: Settings,
    store: PersistenceStore,
    corpus: TrainingCorpus,
    classifier: Classifier,
    session: ClassificationSession,
    classifying: bool,
    class_index: usize,
    latest_frame: Option<FeatureVector>,
    last_label: Option<String>,
    cancel: CancelFlag,
}

impl SessionController {
    pub fn new(settings: Settings, store: PersistenceStore) -> Result<Self, ControllerError> {
        let corpus = TrainingCorpus::new(settings.class_names.as_slice(), settings.feature_len)?;
        let session = ClassificationSession::new(settings.neutral_label.clone());
        Ok(Self {
            settings,
            store,
            corpus,
            classifier: Classifier::untrained(),
            session,
            classifying: false,
            class_index: 0,
            latest_frame: None,
            last_label: None,
            cancel: CancelFlag::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        if self.classifying {
            Mode::Classifying
        } else {
            Mode::Collecting {
                class_index: self.class_index,
            }
        }
    }

    pub fn corpus(&self) -> &TrainingCorpus {
        &self.corpus
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Flag that interrupts an in-flight `Train` from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_active()
    }

    pub fn status(&self) -> ControllerStatus {
        let class = self.current_class().to_string();
        ControllerStatus {
            mode: self.mode(),
            count: self.corpus.count_for(&class),
            class,
            total_examples: self.corpus.total(),
            last_label: self.last_label.clone(),
            recording: self.session.is_active(),
            trained: self.classifier.is_trained(),
        }
    }

    /// Accept one frame from the producer.
    ///
    /// The frame becomes the sample `CaptureSample` stores. While classifying it
    /// is also classified and, when recording, appended to the session.
    pub fn on_frame(&mut self, frame: &[f32]) -> Result<Option<ControllerEvent>, ControllerError> {
        if frame.len() != self.settings.feature_len {
            return Err(ControllerError::InvalidFeatureLength {
                expected: self.settings.feature_len,
                actual: frame.len(),
            });
        }
        let features = FeatureVector::from_frame(frame);
        let event = if self.classifying {
            let label = match self.classifier.classify(&features) {
                Ok(label) => label.to_string(),
                Err(err) => {
                    tracing::error!(error = %err, "Frame classification failed");
                    return Err(ControllerError::Classification(err));
                }
            };
            if self.session.is_active() {
                self.session.append(&label)?;
            }
            self.last_label = Some(label.clone());
            Some(ControllerEvent::Classified { label })
        } else {
            None
        };
        self.latest_frame = Some(features);
        Ok(event)
    }

    /// Apply one command. Failures are reported as [`ControllerEvent::Error`].
    pub fn handle(&mut self, command: Command) -> ControllerEvent {
        let name = command.name();
        match self.try_handle(command) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(command = name, error = %err, "Command failed");
                ControllerEvent::Error(err)
            }
        }
    }

    /// Apply one command, returning failures as errors.
    pub fn try_handle(&mut self, command: Command) -> Result<ControllerEvent, ControllerError> {
        let mode = self.mode();
        let command_name = command.name();
        let event = match (command, mode) {
            (Command::AdvanceClass, Mode::Collecting { .. }) => self.advance_class(),
            (Command::CaptureSample, Mode::Collecting { .. }) => self.capture_sample()?,
            (Command::Train, _) => self.train()?,
            (Command::ToggleRecording, Mode::Classifying) => self.toggle_recording(),
            (Command::ResumeCollecting, Mode::Classifying) => self.resume_collecting(),
            (Command::Save(name), _) => self.save(name)?,
            (Command::Load(name), _) => self.load(name)?,
            _ => {
                tracing::debug!(command = command_name, ?mode, "Ignoring command");
                ControllerEvent::Ignored {
                    command: command_name,
                    mode,
                }
            }
        };
        Ok(event)
    }

    fn current_class(&self) -> &str {
        self.settings
            .class_names
            .get(self.class_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn collecting_event(&self) -> ControllerEvent {
        let class = self.current_class().to_string();
        ControllerEvent::Collecting {
            count: self.corpus.count_for(&class),
            class,
        }
    }
}
