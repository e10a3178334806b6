use crate::store::operations::sources::SourceAuthorization;
use crate::store::{keys, Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![("001_track_authorized_users", m001_track_authorized_users)]
}

/// Apply every migration newer than the stored version.
///
/// Each migration must be idempotent: the process can stop after a migration
/// succeeded but before its version was written, and the next start runs it
/// again. Versions only move forward.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    let all = migrations();

    for (index, (name, func)) in all.iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("corrupt version marker ({} bytes)", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

/// Users that granted a sensor source before tracking existed become tracked.
fn m001_track_authorized_users(store: &Store) -> Result<(), StoreError> {
    for item in store.source_authorizations.iter() {
        let (_, value) = item?;
        let auth: SourceAuthorization = Store::deserialize(&value)?;
        if !auth.granted {
            continue;
        }
        let key = keys::tracked_user_key(&auth.user_id);
        if store.tracked_users.contains_key(key.as_bytes())? {
            continue;
        }
        store.track_user(auth.user_id)?;
    }
    Ok(())
}
