use chrono::NaiveDate;
use uuid::Uuid;

use crate::sensor::Metric;

pub const LAST_CLOSED_DAY_KEY: &str = "_meta:last_closed_day";

// 时间戳固定 20 位补零，保证字典序与时间序一致。
// 写入前已拒绝负时间戳，这里的截断只影响查询边界。
fn padded_ts(timestamp_ms: i64) -> String {
    format!("{:020}", timestamp_ms.max(0) as u64)
}

pub fn daily_aggregate_key(user_id: &Uuid, date: NaiveDate) -> String {
    format!("{}:{}", user_id, date.format("%Y-%m-%d"))
}

pub fn daily_aggregate_prefix(user_id: &Uuid) -> String {
    format!("{}:", user_id)
}

pub fn quantity_sample_key(
    user_id: &Uuid,
    metric: Metric,
    timestamp_ms: i64,
    sample_id: &Uuid,
) -> String {
    format!(
        "{}:{}:{}:{}",
        user_id,
        metric.as_str(),
        padded_ts(timestamp_ms),
        sample_id
    )
}

/// Lower bound for every quantity sample of `metric` at or after `timestamp_ms`.
/// Used as an exclusive upper bound it excludes samples stamped exactly at `timestamp_ms`.
pub fn quantity_sample_bound(user_id: &Uuid, metric: Metric, timestamp_ms: i64) -> String {
    format!(
        "{}:{}:{}:",
        user_id,
        metric.as_str(),
        padded_ts(timestamp_ms)
    )
}

pub fn sleep_interval_key(user_id: &Uuid, end_ms: i64, interval_id: &Uuid) -> String {
    format!("{}:{}:{}", user_id, padded_ts(end_ms), interval_id)
}

pub fn sleep_interval_bound(user_id: &Uuid, end_ms: i64) -> String {
    format!("{}:{}:", user_id, padded_ts(end_ms))
}

pub fn source_authorization_key(user_id: &Uuid) -> String {
    user_id.to_string()
}

pub fn tracked_user_key(user_id: &Uuid) -> String {
    user_id.to_string()
}
