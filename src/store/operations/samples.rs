use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sensor::{Metric, QuantitySample, SleepInterval};
use crate::store::keys;
use crate::store::{Store, StoreError};

impl Store {
    pub fn record_quantity_sample(
        &self,
        user_id: &Uuid,
        metric: Metric,
        sample: &QuantitySample,
    ) -> Result<(), StoreError> {
        self.record_quantity_samples(user_id, metric, std::slice::from_ref(sample))
    }

    pub fn record_quantity_samples(
        &self,
        user_id: &Uuid,
        metric: Metric,
        samples: &[QuantitySample],
    ) -> Result<(), StoreError> {
        if metric.is_interval() {
            return Err(StoreError::Validation(format!(
                "{metric} is recorded as intervals, not point samples"
            )));
        }
        if let Some(early) = samples.iter().find(|s| s.timestamp.timestamp_millis() < 0) {
            return Err(StoreError::Validation(format!(
                "sample timestamp {} predates the unix epoch",
                early.timestamp
            )));
        }
        let mut batch = sled::Batch::default();
        for sample in samples {
            let key = keys::quantity_sample_key(
                user_id,
                metric,
                sample.timestamp.timestamp_millis(),
                &Uuid::new_v4(),
            );
            batch.insert(key.as_bytes(), Self::serialize(sample)?);
        }
        self.quantity_samples.apply_batch(batch)?;
        Ok(())
    }

    /// Samples stamped inside `[start, end)`, oldest first.
    pub fn quantity_samples_in_window(
        &self,
        user_id: &Uuid,
        metric: Metric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuantitySample>, StoreError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let lower = keys::quantity_sample_bound(user_id, metric, start.timestamp_millis());
        let upper = keys::quantity_sample_bound(user_id, metric, end.timestamp_millis());

        let mut samples = Vec::new();
        for item in self.quantity_samples.range(lower.as_bytes()..upper.as_bytes()) {
            let (_, raw) = item?;
            samples.push(Self::deserialize(&raw)?);
        }
        Ok(samples)
    }

    pub fn record_sleep_interval(
        &self,
        user_id: &Uuid,
        interval: &SleepInterval,
    ) -> Result<(), StoreError> {
        self.record_sleep_intervals(user_id, std::slice::from_ref(interval))
    }

    /// Nothing is written unless every interval is valid.
    pub fn record_sleep_intervals(
        &self,
        user_id: &Uuid,
        intervals: &[SleepInterval],
    ) -> Result<(), StoreError> {
        for interval in intervals {
            if interval.end < interval.start {
                return Err(StoreError::Validation(format!(
                    "sleep interval ends ({}) before it starts ({})",
                    interval.end, interval.start
                )));
            }
            if interval.start.timestamp_millis() < 0 {
                return Err(StoreError::Validation(format!(
                    "sleep interval start {} predates the unix epoch",
                    interval.start
                )));
            }
        }
        let mut batch = sled::Batch::default();
        for interval in intervals {
            let key = keys::sleep_interval_key(
                user_id,
                interval.end.timestamp_millis(),
                &Uuid::new_v4(),
            );
            batch.insert(key.as_bytes(), Self::serialize(interval)?);
        }
        self.sleep_intervals.apply_batch(batch)?;
        Ok(())
    }

    /// Intervals whose end falls inside `[start, end)`.
    ///
    /// A night is attributed to the day it ends on, so an interval that began
    /// before midnight still counts in full toward the morning's window.
    pub fn sleep_intervals_ending_in_window(
        &self,
        user_id: &Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepInterval>, StoreError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let lower = keys::sleep_interval_bound(user_id, start.timestamp_millis());
        let upper = keys::sleep_interval_bound(user_id, end.timestamp_millis());

        let mut intervals = Vec::new();
        for item in self.sleep_intervals.range(lower.as_bytes()..upper.as_bytes()) {
            let (_, raw) = item?;
            intervals.push(Self::deserialize(&raw)?);
        }
        Ok(intervals)
    }
}
