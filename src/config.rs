use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub backend: AggregateBackend,
    pub remote: RemoteConfig,
    pub aggregation: AggregationConfig,
    pub worker: WorkerConfig,
}

/// Where computed daily aggregates are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateBackend {
    Local,
    Remote,
}

impl FromStr for AggregateBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "sled" => Ok(Self::Local),
            "remote" | "rest" => Ok(Self::Remote),
            other => Err(format!("unknown aggregate backend '{other}'")),
        }
    }
}

#[derive(Clone)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub aggregate_table: String,
}

#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub utc_offset_minutes: i32,
    pub query_timeout_secs: u64,
    pub max_parallel_users: usize,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    pub daily_aggregation_cron: String,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("api_key", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .field("aggregate_table", &self.aggregate_table)
            .finish()
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            query_timeout_secs: 10,
            max_parallel_users: 8,
        }
    }
}

impl AggregationConfig {
    /// Out-of-range offsets fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        let utc = Utc.fix();
        match self.utc_offset_minutes.checked_mul(60) {
            Some(secs) => FixedOffset::east_opt(secs).unwrap_or_else(|| {
                tracing::warn!(
                    minutes = self.utc_offset_minutes,
                    "UTC offset out of range, using UTC"
                );
                utc
            }),
            None => utc,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/health.sled"),
            backend: env_or_parse("AGGREGATE_BACKEND", AggregateBackend::Local),
            remote: RemoteConfig {
                url: env_or("REMOTE_URL", ""),
                api_key: env_or("REMOTE_API_KEY", ""),
                timeout_secs: env_or_parse("REMOTE_TIMEOUT_SECS", 30_u64),
                aggregate_table: env_or("REMOTE_AGGREGATE_TABLE", "daily_aggregates"),
            },
            aggregation: AggregationConfig {
                utc_offset_minutes: env_or_parse("AGG_UTC_OFFSET_MINUTES", 0_i32),
                query_timeout_secs: env_or_parse("AGG_QUERY_TIMEOUT_SECS", 10_u64),
                max_parallel_users: env_or_parse("AGG_MAX_PARALLEL_USERS", 8_usize).max(1),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
                daily_aggregation_cron: env_or("DAILY_AGGREGATION_CRON", "0 */30 * * * *"),
            },
        }
    }

    /// Startup check for settings that cannot be defaulted.
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == AggregateBackend::Remote && self.remote.url.trim().is_empty() {
            return Err(
                "AGGREGATE_BACKEND=remote requires REMOTE_URL to be set".to_string(),
            );
        }
        Ok(())
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
