use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sensor::{
    Metric, QuantitySample, SensorError, SensorProvider, SleepInterval, UnavailableReason,
};
use crate::store::Store;

/// Reads one user's recorded samples from the local store.
///
/// Access follows the user's stored [`SourceAuthorization`]: no record or a
/// revoked one means permission denied, a metric missing from the record means
/// the device lacks that capability. An authorization row that cannot be read
/// makes the source unavailable too.
///
/// [`SourceAuthorization`]: crate::store::operations::sources::SourceAuthorization
#[derive(Debug, Clone)]
pub struct SledSampleProvider {
    store: Arc<Store>,
    user_id: Uuid,
}

impl SledSampleProvider {
    pub fn new(store: Arc<Store>, user_id: Uuid) -> Self {
        Self { store, user_id }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn check_access(&self, metric: Metric) -> Result<(), SensorError> {
        let auth = self
            .store
            .get_source_authorization(&self.user_id)
            .map_err(|e| {
                tracing::warn!(user_id = %self.user_id, error = %e, "Source authorization unreadable");
                SensorError::unavailable(metric, UnavailableReason::AuthorizationUnreadable)
            })?;
        match auth {
            Some(auth) if auth.granted => {
                if auth.supports(metric) {
                    Ok(())
                } else {
                    Err(SensorError::unavailable(
                        metric,
                        UnavailableReason::CapabilityAbsent,
                    ))
                }
            }
            _ => Err(SensorError::unavailable(
                metric,
                UnavailableReason::PermissionDenied,
            )),
        }
    }
}

#[async_trait]
impl SensorProvider for SledSampleProvider {
    async fn query_window(
        &self,
        metric: Metric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuantitySample>, SensorError> {
        if metric.is_interval() {
            return Err(SensorError::UnsupportedMetric { metric });
        }
        self.check_access(metric)?;
        self.store
            .quantity_samples_in_window(&self.user_id, metric, start, end)
            .map_err(|e| SensorError::query(metric, e.to_string()))
    }

    async fn query_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepInterval>, SensorError> {
        let metric = Metric::SleepAnalysis;
        self.check_access(metric)?;
        self.store
            .sleep_intervals_ending_in_window(&self.user_id, start, end)
            .map_err(|e| SensorError::query(metric, e.to_string()))
    }
}
