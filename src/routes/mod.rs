pub mod aggregates;
pub mod health;
pub mod samples;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::response::AppError;
use crate::state::AppState;

/// Maximum request body size: 4 MiB, enough for a day of per-minute samples.
const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let user_routes = users::router()
        .merge(samples::router())
        .merge(aggregates::router());

    let api_routes = Router::new()
        .nest("/users", user_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .with_state(state)
}

pub(crate) fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::bad_request("INVALID_USER_ID", "user id must be a UUID"))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("INVALID_DATE", "date must be formatted as YYYY-MM-DD"))
}
