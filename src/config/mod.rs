//! Engine settings persisted as TOML in the app directory.
//!
//! The class set and vector length are fixed for the lifetime of a process:
//! they are read once at startup and every corpus, model and artifact is
//! checked against them.

mod defaults;
mod io;


use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::corpus::validate_class_names;
use crate::ml::ClassifierKind;

pub use defaults::DEFAULT_CLASS_NAMES;
pub use io::{config_path, load_from, load_or_default, save, save_to_path};

/// Default filename used to store the engine settings.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that may occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// Settings parsed but describe an unusable engine.
    #[error("Invalid settings: {0}")]
    Invalid(String),
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Ordered class names; order drives class cycling and tie-breaks.
    #[serde(default = "defaults::default_class_names")]
    pub class_names: Vec<String>,
    /// Values per feature vector.
    #[serde(default = "defaults::default_feature_len")]
    pub feature_len: usize,
    /// Class that is discarded from a verdict whenever another class occurred.
    #[serde(default = "defaults::default_neutral_label")]
    pub neutral_label: String,
    #[serde(default)]
    pub classifier: ClassifierKind,
    /// Where artifacts are stored; `None` uses `<app root>/artifacts`.
    #[serde(
        default = "defaults::default_artifact_dir",
        skip_serializing_if = "Option::is_none"
    )]
    pub artifact_dir: Option<PathBuf>,
    /// Artifact name used by `Save`/`Load` without an explicit name.
    #[serde(default = "defaults::default_model_name")]
    pub model_name: String,
    #[serde(default = "defaults::default_corpus_name")]
    pub corpus_name: String,
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "defaults::default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            class_names: defaults::default_class_names(),
            feature_len: defaults::default_feature_len(),
            neutral_label: defaults::default_neutral_label(),
            classifier: ClassifierKind::default(),
            artifact_dir: defaults::default_artifact_dir(),
            model_name: defaults::default_model_name(),
            corpus_name: defaults::default_corpus_name(),
            log_level: defaults::default_log_level(),
        }
    }
}

impl Settings {
    /// Trim names and fill blanks with defaults.
    pub fn normalized(mut self) -> Self {
        for name in &mut self.class_names {
            *name = name.trim().to_string();
        }
        self.neutral_label = self.neutral_label.trim().to_string();
        if self.model_name.trim().is_empty() {
            self.model_name = defaults::default_model_name();
        }
        if self.corpus_name.trim().is_empty() {
            self.corpus_name = defaults::default_corpus_name();
        }
        if self.log_level.trim().is_empty() {
            self.log_level = defaults::default_log_level();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_class_names(self.class_names.as_slice())
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.feature_len == 0 || self.feature_len > defaults::MAX_FEATURE_LEN {
            return Err(ConfigError::Invalid(format!(
                "feature_len must be between 1 and {}",
                defaults::MAX_FEATURE_LEN
            )));
        }
        Ok(())
    }

    /// Artifact directory, falling back to the app directory.
    pub fn resolved_artifact_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.artifact_dir {
            Some(dir) => Ok(dir.clone()),
            None => app_dirs::artifacts_dir().map_err(map_app_dir_error),
        }
    }
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
