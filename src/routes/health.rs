use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Ready once the local store answers a metadata read.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().last_closed_day() {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Store not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
