//! API endpoints for acting on refused interview/visa decisions.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::progress::{apply_decision_action, CountryNotes, DecisionAction, DecisionError, PhaseKey};
use crate::server::types::ApiErrorType;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// Current notes, as a JSON string or object
    #[serde(default)]
    pub notes: Value,
}

fn decision_error_to_response(error: DecisionError) -> Response {
    let (status, message) = if error.is_conflict() {
        (StatusCode::CONFLICT, "Decision cannot be changed")
    } else {
        (StatusCode::BAD_REQUEST, "No decision to act on")
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

/// POST /decisions/:phase/:action
///
/// Applies `retry` or `stop` to a refused decision and returns the updated
/// notes. Nothing is persisted.
pub async fn post_decision(
    Path((phase, action)): Path<(String, String)>,
    Json(body): Json<DecisionRequest>,
) -> Response {
    info!("POST /decisions/{}/{}", phase, action);

    let Some(phase_key) = PhaseKey::from_key(&phase) else {
        return ApiErrorType::from((
            StatusCode::BAD_REQUEST,
            "Unknown phase",
            Some(format!("No phase with key: {}", phase)),
        ))
        .into_response();
    };

    let Some(decision_action) = DecisionAction::from_name(&action) else {
        return ApiErrorType::from((
            StatusCode::BAD_REQUEST,
            "Unknown action",
            Some(format!("Expected retry or stop, got: {}", action)),
        ))
        .into_response();
    };

    let parsed = CountryNotes::parse(&body.notes);
    let notes = parsed.notes.unwrap_or_default();

    match apply_decision_action(&notes, phase_key, decision_action) {
        Ok(updated) => {
            let issues: Vec<String> = parsed.issues.iter().map(|i| i.to_string()).collect();
            (
                StatusCode::OK,
                Json(json!({
                    "phase": phase_key,
                    "action": decision_action,
                    "notes": updated.to_value(),
                    "notesIssues": issues,
                })),
            )
                .into_response()
        }
        Err(e) => {
            warn!("Rejected {:?} on {}: {}", decision_action, phase_key, e);
            decision_error_to_response(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn call(phase: &str, action: &str, notes: Value) -> (StatusCode, Value) {
        let response = post_decision(
            Path((phase.to_string(), action.to_string())),
            Json(DecisionRequest { notes }),
        )
        .await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_stop_refused_visa() {
        let notes = json!("{\"visaStatus\":{\"status\":\"REFUSED\"},\"agent\":\"K. Mensah\"}");
        let (status, body) = call("visa_application", "stop", notes).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notes"]["visaStatus"]["status"], "STOPPED");
        assert_eq!(body["notes"]["agent"], "K. Mensah");
        assert_eq!(body["action"], "STOP");
    }

    #[tokio::test]
    async fn test_retry_approved_is_conflict() {
        let notes = json!({ "casVisaStatus": { "status": "APPROVED" } });
        let (status, body) = call("CAS_VISA", "retry", notes).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["context"].as_str().unwrap().contains("APPROVED"));
    }

    #[tokio::test]
    async fn test_missing_decision_is_bad_request() {
        let notes = json!({ "interviewStatus": { "scheduledDate": "2024-06-01" } });
        let (status, body) = call("INTERVIEW", "stop", notes).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["context"]
            .as_str()
            .unwrap()
            .contains("No decision recorded"));
    }

    #[tokio::test]
    async fn test_stop_keeps_decision_details() {
        let notes = json!({
            "casVisaStatus": { "status": "REFUSED", "remarks": "missing CAS letter" },
            "universityShortlist": {
                "universities": [{ "id": 4, "name": "Leeds", "country": "UK", "intake": "Jan 2026" }]
            }
        });
        let (status, body) = call("CAS_VISA", "stop", notes).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notes"]["casVisaStatus"]["remarks"], "missing CAS letter");
        assert_eq!(
            body["notes"]["universityShortlist"]["universities"][0]["intake"],
            "Jan 2026"
        );
    }

    #[tokio::test]
    async fn test_bad_phase_and_action() {
        let (status, _) = call("OFFER_RECEIVED", "retry", Value::Null).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call("NOT_A_PHASE", "retry", Value::Null).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call("INTERVIEW", "approve", Value::Null).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
