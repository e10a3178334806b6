use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use health_aggregator::aggregation::AggregateRecord;
use health_aggregator::sensor::{
    Metric, QuantitySample, SensorError, SensorProvider, SleepInterval, UnavailableReason,
};
use health_aggregator::store::{AggregateStore, StoreError};

/// In-memory provider returning fixed samples regardless of window.
///
/// Records every window it is asked for.
#[derive(Default)]
pub struct StaticProvider {
    samples: HashMap<Metric, Vec<QuantitySample>>,
    intervals: Vec<SleepInterval>,
    unavailable: HashMap<Metric, UnavailableReason>,
    failing: HashSet<Metric>,
    delays: HashMap<Metric, Duration>,
    seen: Mutex<Vec<(Metric, DateTime<Utc>, DateTime<Utc>)>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples(mut self, metric: Metric, samples: Vec<QuantitySample>) -> Self {
        self.samples.insert(metric, samples);
        self
    }

    pub fn with_intervals(mut self, intervals: Vec<SleepInterval>) -> Self {
        self.intervals = intervals;
        self
    }

    pub fn unavailable(mut self, metric: Metric, reason: UnavailableReason) -> Self {
        self.unavailable.insert(metric, reason);
        self
    }

    pub fn failing(mut self, metric: Metric) -> Self {
        self.failing.insert(metric);
        self
    }

    pub fn slow(mut self, metric: Metric, delay: Duration) -> Self {
        self.delays.insert(metric, delay);
        self
    }

    pub fn seen_windows(&self) -> Vec<(Metric, DateTime<Utc>, DateTime<Utc>)> {
        self.seen.lock().unwrap().clone()
    }

    async fn enter(
        &self,
        metric: Metric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SensorError> {
        self.seen.lock().unwrap().push((metric, start, end));
        if let Some(delay) = self.delays.get(&metric) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(reason) = self.unavailable.get(&metric) {
            return Err(SensorError::unavailable(metric, *reason));
        }
        if self.failing.contains(&metric) {
            return Err(SensorError::query(metric, "device returned garbage"));
        }
        Ok(())
    }
}

#[async_trait]
impl SensorProvider for StaticProvider {
    async fn query_window(
        &self,
        metric: Metric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuantitySample>, SensorError> {
        self.enter(metric, start, end).await?;
        Ok(self.samples.get(&metric).cloned().unwrap_or_default())
    }

    async fn query_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepInterval>, SensorError> {
        self.enter(Metric::SleepAnalysis, start, end).await?;
        Ok(self.intervals.clone())
    }
}

/// Aggregate sink kept in memory, counting write attempts.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(Uuid, NaiveDate), AggregateRecord>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn upsert_aggregate(&self, record: &AggregateRecord) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .insert((record.user_id, record.date), record.clone());
        Ok(())
    }

    async fn select_aggregate(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AggregateRecord>, StoreError> {
        Ok(self.rows.lock().unwrap().get(&(user_id, date)).cloned())
    }
}

/// Sink whose every call fails.
pub struct FailingStore;

#[async_trait]
impl AggregateStore for FailingStore {
    async fn upsert_aggregate(&self, _record: &AggregateRecord) -> Result<(), StoreError> {
        Err(StoreError::Validation("disk full".to_string()))
    }

    async fn select_aggregate(
        &self,
        _user_id: Uuid,
        _date: NaiveDate,
    ) -> Result<Option<AggregateRecord>, StoreError> {
        Err(StoreError::Validation("disk full".to_string()))
    }
}
