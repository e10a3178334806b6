//! Per-metric reductions from raw samples to the scalar stored in a record.
//!
//! Cumulative metrics (steps, energy, distance) are summed, heart rate is
//! averaged, sleep is summed over asleep intervals only. Unit conversion to
//! the stored unit happens here and nowhere else.

use uuid::Uuid;

use crate::aggregation::{AggregateRecord, DayWindow};
use crate::sensor::{Metric, QuantitySample, SleepInterval};

const METERS_PER_KM: f64 = 1000.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Samples read for one window, one list per metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSamples {
    pub steps: Vec<QuantitySample>,
    pub heart_rate: Vec<QuantitySample>,
    pub sleep: Vec<SleepInterval>,
    pub active_energy: Vec<QuantitySample>,
    pub distance: Vec<QuantitySample>,
}

impl MetricSamples {
    /// Metrics that contributed no samples at all.
    pub fn empty_metrics(&self) -> Vec<Metric> {
        let mut empty = Vec::new();
        if self.steps.is_empty() {
            empty.push(Metric::StepCount);
        }
        if self.heart_rate.is_empty() {
            empty.push(Metric::HeartRate);
        }
        if self.sleep.is_empty() {
            empty.push(Metric::SleepAnalysis);
        }
        if self.active_energy.is_empty() {
            empty.push(Metric::ActiveEnergy);
        }
        if self.distance.is_empty() {
            empty.push(Metric::Distance);
        }
        empty
    }

    pub fn is_empty(&self) -> bool {
        self.empty_metrics().len() == Metric::ALL.len()
    }
}

fn usable(sample: &QuantitySample) -> bool {
    sample.value.is_finite() && sample.value >= 0.0
}

fn valid_values(samples: &[QuantitySample]) -> impl Iterator<Item = f64> + '_ {
    samples.iter().filter(|s| usable(s)).map(|s| s.value)
}

/// Sum of usable sample values; empty input is 0.
pub fn total(samples: &[QuantitySample]) -> f64 {
    valid_values(samples).fold(0.0, |acc, v| acc + v)
}

/// Arithmetic mean of usable sample values; empty input is 0, never NaN.
pub fn mean(samples: &[QuantitySample]) -> f64 {
    let (sum, count) = valid_values(samples).fold((0.0, 0_u64), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub fn step_count(samples: &[QuantitySample]) -> u64 {
    total(samples).round() as u64
}

pub fn distance_km(samples_m: &[QuantitySample]) -> f64 {
    total(samples_m) / METERS_PER_KM
}

/// Hours spent in an asleep state. In-bed and awake intervals count for nothing.
pub fn asleep_hours(intervals: &[SleepInterval]) -> f64 {
    let secs = intervals
        .iter()
        .filter(|i| i.state.is_asleep())
        .fold(0.0, |acc, i| acc + i.duration_secs());
    secs / SECONDS_PER_HOUR
}

/// Reduce one window's samples to the day's record.
///
/// Pure: the same user, window and samples always give the same record.
pub fn aggregate(user_id: Uuid, window: &DayWindow, samples: &MetricSamples) -> AggregateRecord {
    let skipped = [
        &samples.steps,
        &samples.heart_rate,
        &samples.active_energy,
        &samples.distance,
    ]
    .iter()
    .map(|list| list.iter().filter(|s| !usable(s)).count())
    .sum::<usize>();
    if skipped > 0 {
        tracing::debug!(%user_id, skipped, "Skipped negative or non-finite samples");
    }

    AggregateRecord {
        user_id,
        date: window.date(),
        step_count: step_count(&samples.steps),
        heart_rate_avg: mean(&samples.heart_rate),
        sleep_hours: asleep_hours(&samples.sleep),
        active_calories: total(&samples.active_energy),
        distance_km: distance_km(&samples.distance),
    }
}
