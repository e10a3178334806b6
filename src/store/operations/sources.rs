use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sensor::Metric;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// What a user's device allows us to read.
///
/// `granted` is the user's answer to the permission prompt; `metrics` lists
/// the capabilities the device actually has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAuthorization {
    pub user_id: Uuid,
    pub granted: bool,
    pub metrics: Vec<Metric>,
    pub updated_at: DateTime<Utc>,
}

impl SourceAuthorization {
    pub fn granted(user_id: Uuid, metrics: &[Metric]) -> Self {
        Self {
            user_id,
            granted: true,
            metrics: metrics.to_vec(),
            updated_at: Utc::now(),
        }
    }

    pub fn revoked(user_id: Uuid) -> Self {
        Self {
            user_id,
            granted: false,
            metrics: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn supports(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }
}

impl Store {
    pub fn set_source_authorization(&self, auth: &SourceAuthorization) -> Result<(), StoreError> {
        let key = keys::source_authorization_key(&auth.user_id);
        self.source_authorizations
            .insert(key.as_bytes(), Self::serialize(auth)?)?;
        Ok(())
    }

    pub fn get_source_authorization(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<SourceAuthorization>, StoreError> {
        let key = keys::source_authorization_key(user_id);
        match self.source_authorizations.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}
