//! Refresh today's aggregate for every tracked user.
//!
//! The first run after local midnight also closes out yesterday: it reads the
//! whole previous day once more so samples recorded after the day's last
//! scheduled run still reach its row.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};

use crate::aggregation::{AggregateError, Aggregator, DayWindow};
use crate::config::AggregationConfig;
use crate::sensor::SledSampleProvider;
use crate::store::operations::tracked_users::TrackedUser;
use crate::store::Store;

/// Per-user outcomes for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayOutcome {
    pub saved: usize,
    pub unavailable: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub today: DayOutcome,
    /// Previous day aggregated in full by this run.
    pub closed: Option<(NaiveDate, DayOutcome)>,
}

pub async fn run(store: &Arc<Store>, aggregator: &Aggregator, config: &AggregationConfig) -> RunSummary {
    run_at(store, aggregator, config, Utc::now()).await
}

/// One pass with the window end frozen at `now` for every user.
pub async fn run_at(
    store: &Arc<Store>,
    aggregator: &Aggregator,
    config: &AggregationConfig,
    now: DateTime<Utc>,
) -> RunSummary {
    let offset = config.utc_offset();
    let today = DayWindow::today(now, offset);
    tracing::info!(date = %today.date(), "Daily aggregation worker running");

    let users = match store.list_tracked_users() {
        Ok(users) => users,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list tracked users");
            return RunSummary::default();
        }
    };

    let mut summary = RunSummary::default();

    if let Some(day) = day_to_close(store, today.date()) {
        let window = DayWindow::full_day(day, offset);
        let outcome = refresh(store, aggregator, config, &users, window).await;
        if let Err(e) = store.set_last_closed_day(day) {
            tracing::warn!(date = %day, error = %e, "Failed to record closed day");
        }
        summary.closed = Some((day, outcome));
    }

    summary.today = refresh(store, aggregator, config, &users, today).await;
    summary
}

fn day_to_close(store: &Store, today: NaiveDate) -> Option<NaiveDate> {
    let yesterday = today.pred_opt()?;
    match store.last_closed_day() {
        Ok(Some(closed)) if closed >= yesterday => None,
        Ok(_) => Some(yesterday),
        Err(e) => {
            tracing::warn!(error = %e, "Closed-day marker unreadable, closing yesterday again");
            Some(yesterday)
        }
    }
}

async fn refresh(
    store: &Arc<Store>,
    aggregator: &Aggregator,
    config: &AggregationConfig,
    users: &[TrackedUser],
    window: DayWindow,
) -> DayOutcome {
    let user_ids: Vec<_> = users.iter().map(|t| t.user_id).collect();
    let outcomes: Vec<Result<(), AggregateError>> = stream::iter(user_ids)
        .map(|user_id| {
            let aggregator = aggregator.clone();
            let provider = SledSampleProvider::new(store.clone(), user_id);
            async move {
                aggregator
                    .compute_and_save(&provider, user_id, &window)
                    .await
                    .map(|_| ())
            }
        })
        .buffer_unordered(config.max_parallel_users.max(1))
        .collect()
        .await;

    let mut outcome = DayOutcome::default();
    for result in outcomes {
        match result {
            Ok(()) => outcome.saved += 1,
            Err(e) if e.is_source_unavailable() => outcome.unavailable += 1,
            Err(_) => outcome.failed += 1,
        }
    }

    tracing::info!(
        date = %window.date(),
        saved = outcome.saved,
        unavailable = outcome.unavailable,
        failed = outcome.failed,
        "Daily aggregation complete"
    );
    outcome
}
