pub mod sled_provider;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use sled_provider::SledSampleProvider;

/// The five metrics read for a daily aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    StepCount,
    HeartRate,
    SleepAnalysis,
    ActiveEnergy,
    Distance,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::StepCount,
        Metric::HeartRate,
        Metric::SleepAnalysis,
        Metric::ActiveEnergy,
        Metric::Distance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StepCount => "step_count",
            Self::HeartRate => "heart_rate",
            Self::SleepAnalysis => "sleep_analysis",
            Self::ActiveEnergy => "active_energy",
            Self::Distance => "distance",
        }
    }

    /// Sleep is read as intervals, everything else as point samples.
    pub fn is_interval(self) -> bool {
        matches!(self, Self::SleepAnalysis)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantitySample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl QuantitySample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepState {
    InBed,
    Awake,
    AsleepUnspecified,
    AsleepCore,
    AsleepDeep,
    AsleepRem,
}

impl SleepState {
    pub fn is_asleep(self) -> bool {
        matches!(
            self,
            Self::AsleepUnspecified | Self::AsleepCore | Self::AsleepDeep | Self::AsleepRem
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub state: SleepState,
}

impl SleepInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, state: SleepState) -> Self {
        Self { start, end, state }
    }

    /// Length in seconds; an inverted interval has no length.
    pub fn duration_secs(&self) -> f64 {
        let millis = (self.end - self.start).num_milliseconds().max(0);
        millis as f64 / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    PermissionDenied,
    CapabilityAbsent,
    /// The stored authorization could not be read, so access cannot be established.
    AuthorizationUnreadable,
    Timeout,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PermissionDenied => "permission not granted",
            Self::CapabilityAbsent => "capability absent on device",
            Self::AuthorizationUnreadable => "authorization state unreadable",
            Self::Timeout => "query timed out",
        };
        f.write_str(text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("sensor source unavailable for {metric}: {reason}")]
    Unavailable {
        metric: Metric,
        reason: UnavailableReason,
    },
    #[error("{metric} is not a point-sample metric")]
    UnsupportedMetric { metric: Metric },
    #[error("sensor query failed for {metric}: {message}")]
    Query { metric: Metric, message: String },
}

impl SensorError {
    pub fn unavailable(metric: Metric, reason: UnavailableReason) -> Self {
        Self::Unavailable { metric, reason }
    }

    pub fn query(metric: Metric, message: impl Into<String>) -> Self {
        Self::Query {
            metric,
            message: message.into(),
        }
    }

    /// Unavailability aborts an aggregation; other failures only zero one metric.
    pub fn unavailable_reason(&self) -> Option<UnavailableReason> {
        match self {
            Self::Unavailable { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Windowed reads over one user's device data.
///
/// Both queries take the half-open window `[start, end)`. Which samples fall
/// inside the window is the provider's decision; the aggregator reduces
/// whatever it is handed.
#[async_trait]
pub trait SensorProvider: Send + Sync {
    async fn query_window(
        &self,
        metric: Metric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuantitySample>, SensorError>;

    async fn query_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepInterval>, SensorError>;
}
