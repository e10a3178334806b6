use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::aggregation::AggregateRecord;
use crate::store::keys;
use crate::store::{AggregateStore, Store, StoreError};

impl Store {
    /// Last write wins: the previous row for `(user_id, date)` is replaced whole.
    pub fn upsert_daily_aggregate(&self, record: &AggregateRecord) -> Result<(), StoreError> {
        let key = keys::daily_aggregate_key(&record.user_id, record.date);
        self.daily_aggregates
            .insert(key.as_bytes(), Self::serialize(record)?)?;
        Ok(())
    }

    pub fn get_daily_aggregate(
        &self,
        user_id: &Uuid,
        date: NaiveDate,
    ) -> Result<Option<AggregateRecord>, StoreError> {
        let key = keys::daily_aggregate_key(user_id, date);
        match self.daily_aggregates.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Most recent days first.
    pub fn list_daily_aggregates(
        &self,
        user_id: &Uuid,
        limit: usize,
    ) -> Result<Vec<AggregateRecord>, StoreError> {
        let prefix = keys::daily_aggregate_prefix(user_id);
        let mut records = Vec::new();
        for item in self.daily_aggregates.scan_prefix(prefix.as_bytes()).rev() {
            if records.len() >= limit {
                break;
            }
            let (_, raw) = item?;
            records.push(Self::deserialize(&raw)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl AggregateStore for Store {
    async fn upsert_aggregate(&self, record: &AggregateRecord) -> Result<(), StoreError> {
        self.upsert_daily_aggregate(record)
    }

    async fn select_aggregate(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AggregateRecord>, StoreError> {
        self.get_daily_aggregate(&user_id, date)
    }
}
