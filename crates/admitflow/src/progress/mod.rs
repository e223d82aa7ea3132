//! Admission phase progress engine
//!
//! Given a student, their documents, applications and per-country profiles,
//! derives which pipeline phase is completed, current or pending, whether
//! the student may advance, and what has been decided so far.
//!
//! The engine performs no I/O and never fails. Callers re-run it whenever
//! any input changes; [`ProgressCache`] is available for memoization.

mod cache;
mod catalog;
mod config;
mod country;
mod decisions;
mod error;
mod notes;
mod overlays;
mod processor;
mod types;

pub use cache::{CacheStats, InputDigest, ProgressCache};
pub use catalog::{catalog, document_collection_requirements, Phase, PhaseKey};
pub use config::ProgressConfig;
pub use country::{
    countries_match, normalize_country, normalize_country_with, UNITED_KINGDOM, UNITED_STATES,
};
pub use decisions::{apply_decision_action, retry_decision, stop_decision, DecisionAction};
pub use error::{ConfigError, DecisionError, NotesError};
pub use notes::{
    CountryNotes, DecisionRecord, DecisionStatus, FinancialOption, ParsedNotes, UniversityList,
    UniversityPick,
};
pub use overlays::{
    resolve_overlays, Advisory, AdvisoryKind, DecisionOverlay, PaymentSelection, PhaseOverlays,
    UniversitySelection,
};
pub use processor::PhaseProgressProcessor;
pub use types::*;

/// Computes progress with the default configuration.
///
/// Shorthand for `PhaseProgressProcessor::default().compute_progress(input)`.
pub fn compute_progress(input: &ProgressInput) -> ProgressReport {
    PhaseProgressProcessor::default().compute_progress(input)
}
