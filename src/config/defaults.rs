use std::path::PathBuf;

use crate::session::DEFAULT_NEUTRAL_LABEL;

/// Classes of the vibration-sensing setup: resting, full container, empty container.
pub const DEFAULT_CLASS_NAMES: &[&str] = &["neutral", "full", "empty"];

pub(super) const MAX_FEATURE_LEN: usize = 1 << 16;

pub(super) fn default_class_names() -> Vec<String> {
    DEFAULT_CLASS_NAMES.iter().map(|name| name.to_string()).collect()
}

pub(super) fn default_feature_len() -> usize {
    512
}

pub(super) fn default_neutral_label() -> String {
    DEFAULT_NEUTRAL_LABEL.to_string()
}

pub(super) fn default_model_name() -> String {
    "model1".to_string()
}

pub(super) fn default_corpus_name() -> String {
    "data1".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_artifact_dir() -> Option<PathBuf> {
    None
}
