use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::aggregation::{AggregateRecord, DayWindow};
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::sensor::SledSampleProvider;
use crate::state::AppState;

use super::{parse_date, parse_user_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:user_id/aggregates/:date",
            get(get_aggregate).put(save_aggregate),
        )
        .route("/:user_id/aggregates/:date/refresh", post(refresh_aggregate))
}

/// Hand-edited values. Field names match the stored row.
#[derive(Debug, Deserialize)]
struct ManualAggregate {
    steps: u64,
    heart_rate_avg: f64,
    sleep_hours: f64,
    active_calories: f64,
    distance_km: f64,
}

async fn get_aggregate(
    Path((user_id, date)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let date = parse_date(&date)?;
    let record = state
        .aggregator()
        .fetch(user_id, date)
        .await?
        .ok_or_else(|| AppError::not_found("no aggregate saved for this day"))?;
    Ok(ok(record))
}

async fn save_aggregate(
    Path((user_id, date)): Path<(String, String)>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ManualAggregate>,
) -> Result<impl IntoResponse, AppError> {
    let record = AggregateRecord {
        user_id: parse_user_id(&user_id)?,
        date: parse_date(&date)?,
        step_count: req.steps,
        heart_rate_avg: req.heart_rate_avg,
        sleep_hours: req.sleep_hours,
        active_calories: req.active_calories,
        distance_km: req.distance_km,
    };
    state.aggregator().save(&record).await?;
    tracing::info!(user_id = %record.user_id, date = %record.date, "Manual aggregate saved");
    Ok(ok(record))
}

/// Recompute one day from the recorded samples and save it.
async fn refresh_aggregate(
    Path((user_id, date)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let window = window_for(&state, parse_date(&date)?)?;
    let provider = SledSampleProvider::new(state.store_handle(), user_id);
    let record = state
        .aggregator()
        .compute_and_save(&provider, user_id, &window)
        .await?;
    Ok(ok(record))
}

/// Today ends now; earlier days are read in full.
fn window_for(state: &AppState, date: NaiveDate) -> Result<DayWindow, AppError> {
    let today = state.today(Utc::now());
    if date == today.date() {
        Ok(today)
    } else if date < today.date() {
        Ok(DayWindow::full_day(date, state.aggregation().utc_offset()))
    } else {
        Err(AppError::bad_request(
            "DATE_IN_FUTURE",
            "cannot aggregate a day that has not started",
        ))
    }
}
