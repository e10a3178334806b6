pub mod record;
pub mod reduce;
pub mod window;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::config::AggregationConfig;
use crate::sensor::{Metric, QuantitySample, SensorError, SensorProvider, UnavailableReason};
use crate::store::{AggregateStore, StoreError};

pub use record::AggregateRecord;
pub use reduce::{aggregate, MetricSamples};
pub use window::DayWindow;

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// Permission missing, capability absent or a read timed out. No record exists.
    #[error("sensor source unavailable while reading {metric}: {reason}")]
    SourceUnavailable {
        metric: Metric,
        reason: UnavailableReason,
    },
    #[error("failed to write daily aggregate: {0}")]
    StoreWriteFailed(#[source] StoreError),
    #[error("failed to read daily aggregate: {0}")]
    StoreReadFailed(#[source] StoreError),
    #[error("invalid aggregate record: {0}")]
    InvalidRecord(String),
    #[error("invalid window: end {end} precedes start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl AggregateError {
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}

/// Computes daily aggregates from a sensor provider and saves them to a store.
///
/// The store handle is injected; the provider is passed per call because it
/// is bound to one user's device data.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn AggregateStore>,
    query_timeout: Duration,
}

impl Aggregator {
    pub fn new(store: Arc<dyn AggregateStore>, config: &AggregationConfig) -> Self {
        Self::with_query_timeout(store, config.query_timeout())
    }

    pub fn with_query_timeout(store: Arc<dyn AggregateStore>, query_timeout: Duration) -> Self {
        Self {
            store,
            query_timeout,
        }
    }

    /// Read all five metrics for `window` concurrently.
    ///
    /// An unavailable source (or a read exceeding the query timeout) aborts
    /// the whole read. Any other failed read leaves that metric empty.
    pub async fn collect<P>(
        &self,
        provider: &P,
        window: &DayWindow,
    ) -> Result<MetricSamples, AggregateError>
    where
        P: SensorProvider + ?Sized,
    {
        let (start, end) = (window.start(), window.end());

        let (steps, heart_rate, sleep, active_energy, distance) = tokio::join!(
            self.read_window(provider, Metric::StepCount, start, end),
            self.read_window(provider, Metric::HeartRate, start, end),
            self.bounded(
                Metric::SleepAnalysis,
                provider.query_intervals(start, end)
            ),
            self.read_window(provider, Metric::ActiveEnergy, start, end),
            self.read_window(provider, Metric::Distance, start, end),
        );

        Ok(MetricSamples {
            steps: settle(Metric::StepCount, steps)?,
            heart_rate: settle(Metric::HeartRate, heart_rate)?,
            sleep: settle(Metric::SleepAnalysis, sleep)?,
            active_energy: settle(Metric::ActiveEnergy, active_energy)?,
            distance: settle(Metric::Distance, distance)?,
        })
    }

    /// Read and reduce one window. Nothing is written.
    pub async fn compute<P>(
        &self,
        provider: &P,
        user_id: Uuid,
        window: &DayWindow,
    ) -> Result<AggregateRecord, AggregateError>
    where
        P: SensorProvider + ?Sized,
    {
        let samples = match self.collect(provider, window).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::info!(%user_id, date = %window.date(), error = %e, "Aggregation aborted");
                return Err(e);
            }
        };

        let empty = samples.empty_metrics();
        if !empty.is_empty() {
            tracing::debug!(%user_id, date = %window.date(), ?empty, "Metrics with no samples");
        }

        Ok(aggregate(user_id, window, &samples))
    }

    /// Compute and upsert. A failed write discards the record.
    pub async fn compute_and_save<P>(
        &self,
        provider: &P,
        user_id: Uuid,
        window: &DayWindow,
    ) -> Result<AggregateRecord, AggregateError>
    where
        P: SensorProvider + ?Sized,
    {
        let record = self.compute(provider, user_id, window).await?;
        self.write(&record).await?;
        tracing::info!(
            %user_id,
            date = %record.date,
            steps = record.step_count,
            "Daily aggregate saved"
        );
        Ok(record)
    }

    /// Save a caller-supplied record, e.g. values edited by hand.
    pub async fn save(&self, record: &AggregateRecord) -> Result<(), AggregateError> {
        record.validate().map_err(AggregateError::InvalidRecord)?;
        self.write(record).await
    }

    pub async fn fetch(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AggregateRecord>, AggregateError> {
        self.store
            .select_aggregate(user_id, date)
            .await
            .map_err(AggregateError::StoreReadFailed)
    }

    async fn write(&self, record: &AggregateRecord) -> Result<(), AggregateError> {
        self.store.upsert_aggregate(record).await.map_err(|e| {
            tracing::warn!(
                user_id = %record.user_id,
                date = %record.date,
                error = %e,
                "Daily aggregate write failed"
            );
            AggregateError::StoreWriteFailed(e)
        })
    }

    async fn read_window<P>(
        &self,
        provider: &P,
        metric: Metric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuantitySample>, SensorError>
    where
        P: SensorProvider + ?Sized,
    {
        self.bounded(metric, provider.query_window(metric, start, end))
            .await
    }

    async fn bounded<T, F>(&self, metric: Metric, read: F) -> Result<Vec<T>, SensorError>
    where
        F: Future<Output = Result<Vec<T>, SensorError>>,
    {
        match tokio::time::timeout(self.query_timeout, read).await {
            Ok(result) => result,
            Err(_) => Err(SensorError::unavailable(metric, UnavailableReason::Timeout)),
        }
    }
}

fn settle<T>(metric: Metric, read: Result<Vec<T>, SensorError>) -> Result<Vec<T>, AggregateError> {
    match read {
        Ok(samples) => Ok(samples),
        Err(e) => match e.unavailable_reason() {
            Some(reason) => Err(AggregateError::SourceUnavailable { metric, reason }),
            None => {
                tracing::warn!(%metric, error = %e, "Metric read failed, counting it as zero");
                Ok(Vec::new())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_keeps_samples() {
        let read: Result<Vec<u8>, SensorError> = Ok(vec![1, 2]);
        assert_eq!(settle(Metric::StepCount, read).unwrap(), vec![1, 2]);
    }

    #[test]
    fn settle_zeroes_ordinary_failures() {
        let read: Result<Vec<u8>, SensorError> =
            Err(SensorError::query(Metric::Distance, "store busy"));
        assert!(settle(Metric::Distance, read).unwrap().is_empty());
    }

    #[test]
    fn settle_aborts_on_unavailable() {
        let read: Result<Vec<u8>, SensorError> = Err(SensorError::unavailable(
            Metric::HeartRate,
            UnavailableReason::CapabilityAbsent,
        ));
        let err = settle(Metric::HeartRate, read).unwrap_err();
        assert!(err.is_source_unavailable());
        assert!(matches!(
            err,
            AggregateError::SourceUnavailable {
                metric: Metric::HeartRate,
                reason: UnavailableReason::CapabilityAbsent,
            }
        ));
    }
}
