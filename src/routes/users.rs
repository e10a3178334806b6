use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, put};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::sensor::Metric;
use crate::state::AppState;
use crate::store::operations::sources::SourceAuthorization;
use crate::store::StoreError;

use super::parse_user_id;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:user_id/authorization",
            put(set_authorization).get(get_authorization),
        )
        .route("/:user_id/tracking", delete(stop_tracking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationRequest {
    granted: bool,
    #[serde(default)]
    metrics: Vec<Metric>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationResponse {
    authorization: SourceAuthorization,
    tracked: bool,
}

/// Record the permission answer. A grant enrols the user in the refresh job;
/// a revocation removes them.
async fn set_authorization(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AuthorizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let authorization = if req.granted {
        SourceAuthorization::granted(user_id, &req.metrics)
    } else {
        SourceAuthorization::revoked(user_id)
    };
    state.store().set_source_authorization(&authorization)?;

    if req.granted {
        state.store().track_user(user_id)?;
    } else {
        match state.store().untrack_user(&user_id) {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(%user_id, granted = req.granted, metrics = ?req.metrics, "Source authorization updated");
    Ok(ok(AuthorizationResponse {
        authorization,
        tracked: req.granted,
    }))
}

async fn get_authorization(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let authorization = state
        .store()
        .get_source_authorization(&user_id)?
        .ok_or_else(|| AppError::not_found("no source authorization recorded"))?;
    Ok(ok(authorization))
}

/// Stop refreshing the user's aggregates. Saved rows and samples are kept.
async fn stop_tracking(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&user_id)?;
    state.store().untrack_user(&user_id)?;
    tracing::info!(%user_id, "User no longer tracked");
    Ok(ok(serde_json::json!({ "tracked": false })))
}
