use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use health_aggregator::aggregation::DayWindow;
use health_aggregator::sensor::{Metric, QuantitySample, SleepInterval, SleepState};
use health_aggregator::store::operations::sources::SourceAuthorization;
use health_aggregator::store::Store;

pub fn setup_store(db_name: &str) -> (TempDir, Arc<Store>) {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let db_path = temp_dir.path().join(db_name);
    let store = Arc::new(Store::open(db_path.to_str().expect("db path")).expect("open store"));
    (temp_dir, store)
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).expect("date")
}

/// Wall-clock time on the reference day, UTC.
pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).unwrap()
}

/// The whole reference day, `[00:00, next 00:00)`.
pub fn full_day() -> DayWindow {
    DayWindow::new(day(), at(0, 0), at(0, 0) + Duration::days(1)).expect("window")
}

pub fn samples(values: &[(DateTime<Utc>, f64)]) -> Vec<QuantitySample> {
    values
        .iter()
        .map(|(ts, v)| QuantitySample::new(*ts, *v))
        .collect()
}

/// Grant every metric to a new user and record the reference day's samples.
pub fn seed_reference_day(store: &Store) -> Uuid {
    let user = Uuid::new_v4();
    store
        .set_source_authorization(&SourceAuthorization::granted(user, &Metric::ALL))
        .expect("grant");

    let rows: [(Metric, Vec<QuantitySample>); 4] = [
        (
            Metric::StepCount,
            samples(&[(at(8, 0), 500.0), (at(12, 0), 300.0), (at(18, 0), 200.0)]),
        ),
        (
            Metric::HeartRate,
            samples(&[(at(8, 0), 60.0), (at(12, 0), 70.0), (at(18, 0), 80.0)]),
        ),
        (
            Metric::ActiveEnergy,
            samples(&[(at(9, 0), 120.5), (at(17, 0), 80.0)]),
        ),
        (
            Metric::Distance,
            samples(&[(at(9, 0), 1500.0), (at(17, 0), 2500.0)]),
        ),
    ];
    for (metric, list) in rows {
        store
            .record_quantity_samples(&user, metric, &list)
            .expect("record samples");
    }

    store
        .record_sleep_interval(
            &user,
            &SleepInterval::new(at(0, 0) - Duration::hours(1), at(6, 0), SleepState::AsleepCore),
        )
        .expect("record sleep");
    store
        .record_sleep_interval(
            &user,
            &SleepInterval::new(at(6, 0), at(6, 30), SleepState::Awake),
        )
        .expect("record awake");

    user
}
