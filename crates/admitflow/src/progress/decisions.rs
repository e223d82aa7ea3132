//! Write-side helpers for interview and visa decisions.
//!
//! The engine only reads decisions. After a refusal the caller may either
//! retry (clear the decision and record a new one later) or stop (terminal).
//! These functions compute the updated notes; persisting them is up to the
//! caller, who then re-runs the engine.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalog::PhaseKey;
use super::error::DecisionError;
use super::notes::{CountryNotes, DecisionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    /// Clear the refusal and re-enter the decision flow
    Retry,
    /// Record STOPPED; no further automatic advancement
    Stop,
}

impl DecisionAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "retry" => Some(DecisionAction::Retry),
            "stop" => Some(DecisionAction::Stop),
            _ => None,
        }
    }
}

/// Clears a refused decision.
pub fn retry_decision(notes: &CountryNotes, phase: PhaseKey) -> Result<CountryNotes, DecisionError> {
    apply_decision_action(notes, phase, DecisionAction::Retry)
}

/// Marks a refused decision as stopped.
pub fn stop_decision(notes: &CountryNotes, phase: PhaseKey) -> Result<CountryNotes, DecisionError> {
    apply_decision_action(notes, phase, DecisionAction::Stop)
}

/// Applies `action` to the decision recorded for `phase`
///
/// # Returns
/// * `Ok(CountryNotes)` - Updated copy of the notes
/// * `Err` - If the phase has no decision or the decision is not REFUSED
pub fn apply_decision_action(
    notes: &CountryNotes,
    phase: PhaseKey,
    action: DecisionAction,
) -> Result<CountryNotes, DecisionError> {
    let mut updated = notes.clone();
    let record = updated
        .decision_slot_mut(phase)
        .ok_or(DecisionError::NotADecisionPhase { phase })?
        .as_mut()
        .ok_or(DecisionError::NoDecisionRecorded { phase })?;

    if record.status != DecisionStatus::Refused {
        return Err(DecisionError::NotRefused {
            phase,
            status: record.status.as_str().to_string(),
        });
    }

    match action {
        DecisionAction::Retry => {
            updated.clear_decision(phase);
        }
        DecisionAction::Stop => record.status = DecisionStatus::Stopped,
    }

    info!("Applied {:?} to refused {} decision", action, phase);

    Ok(updated)
}
