use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::aggregation::{Aggregator, DayWindow};
use crate::config::AggregationConfig;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    aggregator: Aggregator,
    aggregation: Arc<AggregationConfig>,
}

impl AppState {
    pub fn new(store: Arc<Store>, aggregator: Aggregator, aggregation: &AggregationConfig) -> Self {
        Self {
            store,
            aggregator,
            aggregation: Arc::new(aggregation.clone()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_handle(&self) -> Arc<Store> {
        self.store.clone()
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn aggregation(&self) -> &AggregationConfig {
        &self.aggregation
    }

    /// Today's window ending at `now`, in the configured local offset.
    pub fn today(&self, now: DateTime<Utc>) -> DayWindow {
        DayWindow::today(now, self.aggregation.utc_offset())
    }
}
