use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedUser {
    pub user_id: Uuid,
    pub tracked_since: DateTime<Utc>,
}

impl Store {
    /// Re-tracking keeps the original `tracked_since`.
    pub fn track_user(&self, user_id: Uuid) -> Result<TrackedUser, StoreError> {
        let key = keys::tracked_user_key(&user_id);
        if let Some(raw) = self.tracked_users.get(key.as_bytes())? {
            return Self::deserialize(&raw);
        }
        let tracked = TrackedUser {
            user_id,
            tracked_since: Utc::now(),
        };
        self.tracked_users
            .insert(key.as_bytes(), Self::serialize(&tracked)?)?;
        Ok(tracked)
    }

    pub fn untrack_user(&self, user_id: &Uuid) -> Result<(), StoreError> {
        let key = keys::tracked_user_key(user_id);
        match self.tracked_users.remove(key.as_bytes())? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                entity: "tracked_user".to_string(),
                key,
            }),
        }
    }

    pub fn list_tracked_users(&self) -> Result<Vec<TrackedUser>, StoreError> {
        let mut users = Vec::new();
        for item in self.tracked_users.iter() {
            let (_, raw) = item?;
            users.push(Self::deserialize(&raw)?);
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_untrack_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path().join("tracked.sled").to_str().unwrap()).unwrap();
        let user = Uuid::new_v4();

        let first = store.track_user(user).unwrap();
        let again = store.track_user(user).unwrap();
        assert_eq!(first, again);
        assert_eq!(store.list_tracked_users().unwrap().len(), 1);

        store.untrack_user(&user).unwrap();
        assert!(store.list_tracked_users().unwrap().is_empty());

        let err = store.untrack_user(&user).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
