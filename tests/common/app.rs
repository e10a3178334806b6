use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use health_aggregator::aggregation::Aggregator;
use health_aggregator::config::AggregationConfig;
use health_aggregator::routes::build_router;
use health_aggregator::state::AppState;
use health_aggregator::store::{AggregateStore, Store};

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<Store>,
    _temp_dir: TempDir,
}

pub fn spawn_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("ingest-test.sled");
    let store = Arc::new(Store::open(sled_path.to_str().expect("db path")).expect("open store"));
    store.run_migrations().expect("migrations");

    let aggregation = AggregationConfig::default();
    let sink: Arc<dyn AggregateStore> = store.clone();
    let state = AppState::new(store.clone(), Aggregator::new(sink, &aggregation), &aggregation);

    TestApp {
        app: build_router(state.clone()),
        state,
        store,
        _temp_dir: temp_dir,
    }
}
