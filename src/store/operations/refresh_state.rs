use chrono::NaiveDate;

use crate::store::keys;
use crate::store::{Store, StoreError};

impl Store {
    /// Last local day the refresh worker aggregated over its full length.
    pub fn last_closed_day(&self) -> Result<Option<NaiveDate>, StoreError> {
        match self.meta.get(keys::LAST_CLOSED_DAY_KEY.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_last_closed_day(&self, date: NaiveDate) -> Result<(), StoreError> {
        self.meta
            .insert(keys::LAST_CLOSED_DAY_KEY.as_bytes(), Self::serialize(&date)?)?;
        Ok(())
    }
}
