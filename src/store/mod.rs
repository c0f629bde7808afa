//! Named model and corpus artifacts on disk.
//!
//! Models and corpora are stored independently (`<name>.model.json` and
//! `<name>.corpus.json`) so either can be restored without the other. Writes
//! go through [`crate::atomic_file`]; a failed save never leaves a partial
//! artifact that a later load would accept.

pub mod schema;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::atomic_file::{atomic_write, is_temp_file, stale_temp_files};
use crate::corpus::{CorpusError, TrainingCorpus};
use crate::ml::TrainedModel;
use schema::{CorpusArtifact, ModelArtifact};

pub const MODEL_EXTENSION: &str = "model.json";
pub const CORPUS_EXTENSION: &str = "corpus.json";

/// Errors raised while saving or loading artifacts.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Artifact names are limited to ASCII letters, digits, `-` and `_`.
    #[error("Invalid artifact name {name:?}")]
    InvalidName { name: String },
    #[error("No model artifact at {path}")]
    ModelNotFound { path: PathBuf },
    #[error("No corpus artifact at {path}")]
    CorpusNotFound { path: PathBuf },
    /// The artifact exists but cannot be decoded or fails validation.
    #[error("Corrupt artifact {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },
    /// The artifact was written for a different class set or vector length.
    #[error("Artifact {path} does not match the configured schema: {reason}")]
    SchemaMismatch { path: PathBuf, reason: String },
    #[error("Failed to create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode artifact {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Saved artifact names found in the store directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactListing {
    pub models: Vec<String>,
    pub corpora: Vec<String>,
}

/// Reads and writes artifacts for one configured class set.
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    dir: PathBuf,
    class_names: Vec<String>,
    feature_len: usize,
}

impl PersistenceStore {
    pub fn new(dir: impl Into<PathBuf>, class_names: &[String], feature_len: usize) -> Self {
        Self {
            dir: dir.into(),
            class_names: class_names.to_vec(),
            feature_len,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        self.artifact_path(name, MODEL_EXTENSION)
    }

    pub fn corpus_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        self.artifact_path(name, CORPUS_EXTENSION)
    }

    fn artifact_path(&self, name: &str, extension: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{extension}")))
    }

    pub fn save_model(&self, model: &TrainedModel, name: &str) -> Result<PathBuf, StoreError> {
        let path = self.model_path(name)?;
        self.write_json(&path, &ModelArtifact::from_model(model))?;
        tracing::info!(path = %path.display(), kind = model.kind().as_str(), "Saved model");
        Ok(path)
    }

    /// Load a model and check it against the configured classes and length.
    pub fn load_model(&self, name: &str) -> Result<TrainedModel, StoreError> {
        let path = self.model_path(name)?;
        let bytes = read_artifact(&path, || StoreError::ModelNotFound { path: path.clone() })?;
        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|err| corrupt(&path, err))?;
        // Compare against the configured schema before the payload is decoded.
        if artifact.classes != self.class_names {
            return Err(StoreError::SchemaMismatch {
                path,
                reason: format!(
                    "model classes {:?}, configured {:?}",
                    artifact.classes, self.class_names
                ),
            });
        }
        check_feature_len(&path, "model", artifact.feature_len, self.feature_len)?;
        let model = artifact.into_model().map_err(|reason| corrupt(&path, reason))?;
        tracing::info!(path = %path.display(), kind = model.kind().as_str(), "Loaded model");
        Ok(model)
    }

    pub fn save_corpus(&self, corpus: &TrainingCorpus, name: &str) -> Result<PathBuf, StoreError> {
        let path = self.corpus_path(name)?;
        self.write_json(&path, &CorpusArtifact::from_corpus(corpus))?;
        tracing::info!(path = %path.display(), examples = corpus.total(), "Saved corpus");
        Ok(path)
    }

    /// Load a corpus whose class set must equal the configured one.
    ///
    /// Buckets come back in configured order even when the artifact listed
    /// them differently.
    pub fn load_corpus(&self, name: &str) -> Result<TrainingCorpus, StoreError> {
        let path = self.corpus_path(name)?;
        let bytes = read_artifact(&path, || StoreError::CorpusNotFound { path: path.clone() })?;
        let artifact: CorpusArtifact =
            serde_json::from_slice(&bytes).map_err(|err| corrupt(&path, err))?;
        check_feature_len(&path, "corpus", artifact.feature_len, self.feature_len)?;
        let loaded = artifact.into_corpus().map_err(|reason| corrupt(&path, reason))?;
        let mut corpus = TrainingCorpus::new(self.class_names.as_slice(), self.feature_len)
            .map_err(|err| StoreError::SchemaMismatch {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        corpus.replace(loaded).map_err(|err| match err {
            CorpusError::SchemaMismatch { .. } => StoreError::SchemaMismatch {
                path: path.clone(),
                reason: err.to_string(),
            },
            other => corrupt(&path, other),
        })?;
        tracing::info!(path = %path.display(), examples = corpus.total(), "Loaded corpus");
        Ok(corpus)
    }

    /// Names of saved models and corpora, sorted.
    pub fn list(&self) -> Result<ArtifactListing, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ArtifactListing::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.dir.clone(),
                    source,
                });
            }
        };
        let mut models = BTreeSet::new();
        let mut corpora = BTreeSet::new();
        for path in entries.filter_map(|entry| entry.ok()).map(|entry| entry.path()) {
            if is_temp_file(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(&format!(".{MODEL_EXTENSION}")) {
                models.insert(name.to_string());
            } else if let Some(name) = file_name.strip_suffix(&format!(".{CORPUS_EXTENSION}")) {
                corpora.insert(name.to_string());
            }
        }
        Ok(ArtifactListing {
            models: models.into_iter().collect(),
            corpora: corpora.into_iter().collect(),
        })
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        atomic_write(path, &bytes).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        // Leftovers from an interrupted earlier save of the same artifact.
        for stale in stale_temp_files(path) {
            if let Err(err) = std::fs::remove_file(&stale) {
                tracing::warn!(path = %stale.display(), error = %err, "Failed to remove stale temp file");
            }
        }
        Ok(())
    }
}

fn read_artifact(
    path: &Path,
    not_found: impl FnOnce() -> StoreError,
) -> Result<Vec<u8>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn check_feature_len(
    path: &Path,
    kind: &str,
    found: usize,
    configured: usize,
) -> Result<(), StoreError> {
    if found == configured {
        return Ok(());
    }
    Err(StoreError::SchemaMismatch {
        path: path.to_path_buf(),
        reason: format!("{kind} expects {found} values, configured {configured}"),
    })
}

fn corrupt(path: &Path, reason: impl ToString) -> StoreError {
    StoreError::CorruptArtifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests;
