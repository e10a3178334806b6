pub const DAILY_AGGREGATES: &str = "daily_aggregates";
pub const QUANTITY_SAMPLES: &str = "quantity_samples";
pub const SLEEP_INTERVALS: &str = "sleep_intervals";
pub const SOURCE_AUTHORIZATIONS: &str = "source_authorizations";
pub const TRACKED_USERS: &str = "tracked_users";
pub const META: &str = "meta";
