use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::extractors::JsonBody;
use crate::response::{created, AppError};
use crate::sensor::{Metric, QuantitySample, SleepInterval};
use crate::state::AppState;

use super::parse_user_id;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:user_id/samples", post(record_samples))
        .route("/:user_id/sleep", post(record_sleep))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SamplesRequest {
    metric: Metric,
    samples: Vec<QuantitySample>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SleepRequest {
    intervals: Vec<SleepInterval>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordedResponse {
    recorded: usize,
}

async fn record_samples(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SamplesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&user_id)?;
    state
        .store()
        .record_quantity_samples(&user_id, req.metric, &req.samples)?;

    tracing::debug!(%user_id, metric = %req.metric, count = req.samples.len(), "Samples recorded");
    Ok(created(RecordedResponse {
        recorded: req.samples.len(),
    }))
}

async fn record_sleep(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SleepRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&user_id)?;
    state
        .store()
        .record_sleep_intervals(&user_id, &req.intervals)?;

    tracing::debug!(%user_id, count = req.intervals.len(), "Sleep intervals recorded");
    Ok(created(RecordedResponse {
        recorded: req.intervals.len(),
    }))
}
