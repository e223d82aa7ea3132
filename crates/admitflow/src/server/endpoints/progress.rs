//! API endpoints for phase progress.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::progress::{catalog, InputDigest, ProgressInput, RecordId};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// Query parameters for progress computation.
#[derive(Debug, Default, Deserialize)]
pub struct ProgressQueryParams {
    /// If true, bypass the cache and recompute
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateQueryParams {
    /// Only drop this student's report
    pub student_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeQueryParams {
    pub name: Option<String>,
}

/// GET /health
pub async fn get_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// GET /phases
///
/// Returns the phase catalog in pipeline order.
pub async fn get_phases() -> Response {
    (StatusCode::OK, Json(catalog())).into_response()
}

/// POST /progress
///
/// Computes the progress report for the posted student data.
///
/// Query parameters:
/// - `refresh` (optional): Set to `true` to bypass cache
pub async fn post_progress(
    State(s): State<Arc<AppState>>,
    Query(params): Query<ProgressQueryParams>,
    Json(input): Json<ProgressInput>,
) -> Response {
    info!(
        "POST /progress - student {} (refresh={})",
        input.student.id, params.refresh
    );

    let digest = match InputDigest::of(&input) {
        Ok(digest) => Some(digest),
        Err(e) => {
            warn!("Could not digest progress input, skipping cache: {}", e);
            None
        }
    };

    let student = &input.student.id;
    if let Some(digest) = digest.as_ref().filter(|_| !params.refresh) {
        if let Some(report) = s.progress_cache.get(student, digest) {
            debug!("Progress cache hit for student {}", student);
            return (StatusCode::OK, Json(report)).into_response();
        }
    }

    let report = s.processor.compute_progress(&input);
    if let Some(digest) = digest {
        s.progress_cache.store(student.clone(), digest, report.clone());
    }

    (StatusCode::OK, Json(report)).into_response()
}

/// GET /countries/normalize?name=
///
/// Returns the canonical form of a country name.
pub async fn get_normalized_country(
    State(s): State<Arc<AppState>>,
    Query(params): Query<NormalizeQueryParams>,
) -> Response {
    match params.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let normalized = s.processor.normalize_country(name);
            (
                StatusCode::OK,
                Json(json!({ "input": name, "normalized": normalized })),
            )
                .into_response()
        }
        None => ApiErrorType::from((
            StatusCode::BAD_REQUEST,
            "Missing country name",
            Some("Pass the country as ?name=".to_string()),
        ))
        .into_response(),
    }
}

/// GET /progress/cache_stats
///
/// Returns cache statistics for monitoring.
pub async fn get_cache_stats(State(s): State<Arc<AppState>>) -> Response {
    (StatusCode::OK, Json(s.progress_cache.stats())).into_response()
}

/// POST /progress/invalidate_cache
///
/// Clears every cached report, or only one student's.
///
/// Query parameters:
/// - `studentId` (optional): Student whose report should be dropped
pub async fn invalidate_cache(
    State(s): State<Arc<AppState>>,
    Query(params): Query<InvalidateQueryParams>,
) -> Response {
    info!(
        "POST /progress/invalidate_cache (studentId={:?})",
        params.student_id
    );

    match params.student_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(raw) => {
            let removed = s.progress_cache.invalidate_student(&RecordId::from(raw));
            (
                StatusCode::OK,
                Json(json!({ "message": "Student report invalidated", "removed": removed })),
            )
                .into_response()
        }
        None => {
            s.progress_cache.clear();
            (StatusCode::OK, Json(json!({ "message": "Cache invalidated" }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn shortlisting_input() -> ProgressInput {
        serde_json::from_value(json!({
            "student": {
                "id": 3,
                "firstName": "Omar",
                "lastName": "Haddad",
                "currentPhase": "UNIVERSITY_SHORTLISTING"
            },
            "countryProfiles": [{
                "country": "UK",
                "currentPhase": "UNIVERSITY_SHORTLISTING",
                "notes": "{\"universityShortlist\":{\"universities\":[{\"id\":1,\"name\":\"X\",\"country\":\"UK\"}]}}"
            }],
            "selectedCountry": "United Kingdom"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_post_progress_caches_report() {
        let state = Arc::new(AppState::default());

        let response = post_progress(
            State(state.clone()),
            Query(ProgressQueryParams::default()),
            Json(shortlisting_input()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["currentIndex"], 1);
        assert_eq!(body["overlays"]["shortlist"]["universities"][0]["name"], "X");
        assert_eq!(body["phases"][2]["canProceedToNext"], true);
        assert_eq!(state.progress_cache.len(), 1);

        // Second identical request is served from the cache
        post_progress(
            State(state.clone()),
            Query(ProgressQueryParams::default()),
            Json(shortlisting_input()),
        )
        .await;

        let stats = body_json(get_cache_stats(State(state.clone())).await).await;
        assert_eq!(stats["students"], 1);
        assert_eq!(stats["hits"], 1);
        assert_eq!(stats["maxStudents"], 10_000);

        invalidate_cache(State(state.clone()), Query(InvalidateQueryParams::default())).await;
        assert!(state.progress_cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_single_student() {
        let state = Arc::new(AppState::default());
        post_progress(
            State(state.clone()),
            Query(ProgressQueryParams::default()),
            Json(shortlisting_input()),
        )
        .await;

        let other = invalidate_cache(
            State(state.clone()),
            Query(InvalidateQueryParams {
                student_id: Some("4".to_string()),
            }),
        )
        .await;
        assert_eq!(body_json(other).await["removed"], false);
        assert_eq!(state.progress_cache.len(), 1);

        let own = invalidate_cache(
            State(state.clone()),
            Query(InvalidateQueryParams {
                student_id: Some("3".to_string()),
            }),
        )
        .await;
        assert_eq!(body_json(own).await["removed"], true);
        assert!(state.progress_cache.is_empty());
    }

    #[tokio::test]
    async fn test_normalize_endpoint() {
        let state = Arc::new(AppState::default());

        let response = get_normalized_country(
            State(state.clone()),
            Query(NormalizeQueryParams {
                name: Some("u.k.".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["normalized"], "UNITED KINGDOM");

        let missing = get_normalized_country(State(state), Query(NormalizeQueryParams { name: None })).await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_phases_endpoint() {
        let body = body_json(get_phases().await).await;
        let phases = body.as_array().unwrap();

        assert_eq!(phases.len(), 10);
        assert_eq!(phases[0]["key"], "DOCUMENT_COLLECTION");
        assert_eq!(phases[0]["requiredDocumentTypes"].as_array().unwrap().len(), 5);
        assert_eq!(phases[9]["colorHint"], "#4CAF50");
    }
}
