use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tracing::debug;

use crate::server::endpoints::{decisions, progress};
use crate::types::AppState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let progress_router = Router::new()
        .route("/progress", post(progress::post_progress))
        .route("/progress/cache_stats", get(progress::get_cache_stats))
        .route(
            "/progress/invalidate_cache",
            post(progress::invalidate_cache),
        );

    // Decisions only rewrite the notes they are given; persisting is the caller's job
    let decision_router =
        Router::new().route("/decisions/:phase/:action", post(decisions::post_decision));

    Router::new()
        .route("/health", get(progress::get_health))
        .route("/phases", get(progress::get_phases))
        .route("/countries/normalize", get(progress::get_normalized_country))
        .merge(progress_router)
        .merge(decision_router)
        .with_state(app_state)
}

/// Drops stale progress reports every `every` until the task is aborted.
///
/// Without this, reports for students nobody asks about again would sit in
/// the cache until capacity forces them out.
pub async fn run_cache_sweeper(app_state: Arc<AppState>, every: Duration) {
    loop {
        tokio::time::sleep(every).await;

        let removed = app_state.progress_cache.purge_expired();
        if removed > 0 {
            debug!("Cache sweep removed {} stale reports", removed);
        }
    }
}
