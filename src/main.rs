use std::net::SocketAddr;
use std::sync::Arc;

use health_aggregator::aggregation::Aggregator;
use health_aggregator::config::{AggregateBackend, Config};
use health_aggregator::logging::{init_tracing, LogConfig};
use health_aggregator::remote::RemoteTableClient;
use health_aggregator::routes::build_router;
use health_aggregator::state::AppState;
use health_aggregator::store::{AggregateStore, Store};
use health_aggregator::workers::WorkerManager;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    if let Err(e) = init_tracing(&LogConfig::from(&config)) {
        eprintln!("FATAL: failed to initialise logging: {e}");
        std::process::exit(1);
    }
    tracing::info!(backend = ?config.backend, "Starting health-aggregator");

    if let Err(e) = config.validate() {
        fatal("Invalid configuration", e);
    }

    let store = match Store::open(&config.sled_path) {
        Ok(store) => Arc::new(store),
        Err(e) => fatal("Failed to open sled database", e),
    };
    if let Err(e) = store.run_migrations() {
        fatal("Failed to run migrations", e);
    }

    let sink: Arc<dyn AggregateStore> = match config.backend {
        AggregateBackend::Local => store.clone(),
        AggregateBackend::Remote => match RemoteTableClient::new(&config.remote) {
            Ok(client) => Arc::new(client),
            Err(e) => fatal("Failed to build remote client", e),
        },
    };
    let aggregator = Aggregator::new(sink, &config.aggregation);

    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(store.clone(), aggregator.clone(), &config.aggregation);

    let worker_manager = WorkerManager::new(
        store.clone(),
        aggregator,
        shutdown_tx.subscribe(),
        &config.worker,
        &config.aggregation,
    );
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker_manager.start().await {
            tracing::error!(error = %e, "Worker manager failed");
        }
    });

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new());

    let addr = SocketAddr::new(config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => fatal("Failed to bind TCP listener", e),
    };
    tracing::info!(%addr, "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
        .await
    {
        tracing::error!(error = %e, "HTTP server crashed");
        let _ = shutdown_tx.send(());
    }

    match worker_handle.await {
        Err(e) => tracing::error!(error = %e, "Worker task panicked"),
        Ok(()) => tracing::info!("Worker manager exited normally"),
    }

    tracing::info!("Flushing store before exit");
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
}

fn fatal(context: &str, error: impl std::fmt::Display) -> ! {
    tracing::error!(error = %error, "{context}");
    std::process::exit(1);
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
