//! Error types for the progress engine and its write-side helpers.
//!
//! The engine itself never fails; these surface either as advisories in a
//! report or from the explicit operations around it.

use thiserror::Error;

use super::catalog::PhaseKey;

/// Problems found while reading a notes blob.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotesError {
    /// A string blob that is not valid JSON
    #[error("Notes are not valid JSON: {message}")]
    InvalidJson { message: String },

    /// Valid JSON, but not an object
    #[error("Notes must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// A known section with an unexpected shape
    #[error("Malformed notes section `{section}`: {message}")]
    MalformedSection { section: String, message: String },

    /// A decision section whose status is not APPROVED, REFUSED or STOPPED
    #[error("Unknown decision status `{value}` in `{section}`")]
    UnknownDecision { section: String, value: String },
}

impl NotesError {
    /// Returns true if the whole blob was discarded, not just one section.
    pub fn discards_notes(&self) -> bool {
        matches!(
            self,
            NotesError::InvalidJson { .. } | NotesError::NotAnObject { .. }
        )
    }
}

/// Errors from retry/stop decision actions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecisionError {
    /// The phase does not carry an approve/refuse decision
    #[error("Phase {phase} has no decision")]
    NotADecisionPhase { phase: PhaseKey },

    /// Nothing recorded yet for this phase
    #[error("No decision recorded for {phase}")]
    NoDecisionRecorded { phase: PhaseKey },

    /// Retry and stop are only offered after a refusal
    #[error("Decision for {phase} is {status}, expected REFUSED")]
    NotRefused { phase: PhaseKey, status: String },
}

impl DecisionError {
    /// Returns true if a decision exists but its status forbids the action.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DecisionError::NotRefused { .. })
    }
}

/// Errors loading [`super::config::ProgressConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
