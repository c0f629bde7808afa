//! Recording sessions and majority-vote verdicts.
//!
//! While recording, every per-frame label is appended in arrival order. When
//! recording stops the sequence collapses into a single verdict:
//!
//! - frequencies are counted per distinct label;
//! - if more than one distinct label occurred and the neutral label is one of
//!   them, neutral is dropped entirely, even when it was the most frequent;
//! - the highest count wins, and equal counts go to the label that first
//!   appeared earliest in the recording;
//! - an empty recording has no verdict.

use thiserror::Error;

/// Default name of the resting class that never outvotes a real event.
pub const DEFAULT_NEUTRAL_LABEL: &str = "neutral";

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    /// A label arrived while no recording was active.
    #[error("No recording session is active")]
    SessionNotActive,
}

/// Labels classified during one recording interval.
#[derive(Debug, Clone)]
pub struct ClassificationSession {
    neutral_label: String,
    labels: Vec<String>,
    active: bool,
}

impl Default for ClassificationSession {
    fn default() -> Self {
        Self::new(DEFAULT_NEUTRAL_LABEL)
    }
}

impl ClassificationSession {
    pub fn new(neutral_label: impl Into<String>) -> Self {
        Self {
            neutral_label: neutral_label.into(),
            labels: Vec::new(),
            active: false,
        }
    }

    /// Begin a new recording, discarding anything from a previous one.
    pub fn start(&mut self) {
        self.labels.clear();
        self.active = true;
    }

    pub fn append(&mut self, label: &str) -> Result<(), SessionError> {
        if !self.active {
            return Err(SessionError::SessionNotActive);
        }
        self.labels.push(label.to_string());
        Ok(())
    }

    /// End the recording and resolve its verdict. The sequence is cleared.
    pub fn stop(&mut self) -> Option<String> {
        self.active = false;
        let verdict = resolve_verdict(&self.labels, &self.neutral_label);
        self.labels.clear();
        verdict
    }

    /// End the recording without resolving a verdict.
    pub fn abandon(&mut self) {
        self.active = false;
        self.labels.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Majority vote over `labels`, discarding `neutral` when anything else occurred.
pub fn resolve_verdict<S: AsRef<str>>(labels: &[S], neutral: &str) -> Option<String> {
    // Distinct labels in order of first appearance.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in labels.iter().map(|label| label.as_ref()) {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }
    if counts.len() > 1 {
        counts.retain(|(label, _)| *label != neutral);
    }
    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(labels: &[&str]) -> Option<String> {
        resolve_verdict(labels, DEFAULT_NEUTRAL_LABEL)
    }

    #[test]
    fn neutral_is_discarded_once_another_label_appears() {
        assert_eq!(verdict(&["neutral", "neutral", "full"]).as_deref(), Some("full"));
        assert_eq!(
            verdict(&["neutral", "neutral", "neutral", "empty", "full", "full"]).as_deref(),
            Some("full")
        );
    }

    #[test]
    fn neutral_only_recording_resolves_to_neutral() {
        assert_eq!(verdict(&["neutral", "neutral"]).as_deref(), Some("neutral"));
    }

    #[test]
    fn empty_recording_has_no_verdict() {
        assert_eq!(verdict(&[]), None);
    }

    #[test]
    fn tie_goes_to_label_seen_first() {
        assert_eq!(verdict(&["full", "empty"]).as_deref(), Some("full"));
        assert_eq!(verdict(&["empty", "full"]).as_deref(), Some("empty"));
        assert_eq!(
            verdict(&["neutral", "empty", "full", "full", "empty"]).as_deref(),
            Some("empty")
        );
    }

    #[test]
    fn session_collects_only_while_active() {
        let mut session = ClassificationSession::default();
        assert_eq!(
            session.append("full"),
            Err(SessionError::SessionNotActive)
        );
        session.start();
        session.append("neutral").unwrap();
        session.append("full").unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.stop().as_deref(), Some("full"));
        assert!(!session.is_active());
        assert!(session.is_empty());
        assert_eq!(
            session.append("full"),
            Err(SessionError::SessionNotActive)
        );
    }

    #[test]
    fn restart_discards_previous_labels() {
        let mut session = ClassificationSession::default();
        session.start();
        session.append("empty").unwrap();
        session.start();
        session.append("full").unwrap();
        assert_eq!(session.labels(), &["full".to_string()]);
        assert_eq!(session.stop().as_deref(), Some("full"));
        session.start();
        assert_eq!(session.stop(), None);
    }

    #[test]
    fn custom_neutral_label_is_honoured() {
        let mut session = ClassificationSession::new("idle");
        session.start();
        for label in ["idle", "idle", "idle", "tap"] {
            session.append(label).unwrap();
        }
        assert_eq!(session.stop().as_deref(), Some("tap"));
    }
}
