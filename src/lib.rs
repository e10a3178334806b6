pub mod aggregation;
pub mod config;
pub mod extractors;
pub mod logging;
pub mod remote;
pub mod response;
pub mod routes;
pub mod sensor;
pub mod state;
pub mod store;
pub mod workers;
