use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user's summary for one calendar day.
///
/// `(user_id, date)` is the natural key. Field names match the remote table's
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub user_id: Uuid,
    pub date: NaiveDate,
    #[serde(rename = "steps")]
    pub step_count: u64,
    pub heart_rate_avg: f64,
    pub sleep_hours: f64,
    pub active_calories: f64,
    pub distance_km: f64,
}

impl AggregateRecord {
    pub fn zeroed(user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            step_count: 0,
            heart_rate_avg: 0.0,
            sleep_hours: 0.0,
            active_calories: 0.0,
            distance_km: 0.0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.step_count == 0
            && self.heart_rate_avg == 0.0
            && self.sleep_hours == 0.0
            && self.active_calories == 0.0
            && self.distance_km == 0.0
    }

    /// Every real-valued field must be finite and non-negative.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("heart_rate_avg", self.heart_rate_avg),
            ("sleep_hours", self.sleep_hours),
            ("active_calories", self.active_calories),
            ("distance_km", self.distance_km),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{name} must be finite, got {value}"));
            }
            if value < 0.0 {
                return Err(format!("{name} must not be negative, got {value}"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for AggregateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps={} heart_rate={:.1} bpm sleep={:.1} h active={:.0} kcal distance={:.2} km",
            self.date,
            self.step_count,
            self.heart_rate_avg,
            self.sleep_hours,
            self.active_calories,
            self.distance_km
        )
    }
}
