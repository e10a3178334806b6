pub mod daily_aggregates;
pub mod refresh_state;
pub mod samples;
pub mod sources;
pub mod tracked_users;
