pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;
use uuid::Uuid;

use crate::aggregation::AggregateRecord;
use crate::remote::RemoteError;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub daily_aggregates: sled::Tree,
    pub quantity_samples: sled::Tree,
    pub sleep_intervals: sled::Tree,
    pub source_authorizations: sled::Tree,
    pub tracked_users: sled::Tree,
    pub meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("remote store error: {0}")]
    Remote(#[from] RemoteError),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

/// Destination for daily aggregate rows, keyed by `(user_id, date)`.
///
/// An upsert replaces the whole row sharing the key; fields are never merged.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn upsert_aggregate(&self, record: &AggregateRecord) -> Result<(), StoreError>;

    async fn select_aggregate(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AggregateRecord>, StoreError>;
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let daily_aggregates = db.open_tree(trees::DAILY_AGGREGATES)?;
        let quantity_samples = db.open_tree(trees::QUANTITY_SAMPLES)?;
        let sleep_intervals = db.open_tree(trees::SLEEP_INTERVALS)?;
        let source_authorizations = db.open_tree(trees::SOURCE_AUTHORIZATIONS)?;
        let tracked_users = db.open_tree(trees::TRACKED_USERS)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            daily_aggregates,
            quantity_samples,
            sleep_intervals,
            source_authorizations,
            tracked_users,
            meta,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
