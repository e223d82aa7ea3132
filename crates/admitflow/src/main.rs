use std::env;
use std::path::Path;
use std::sync::Arc;

use admitflow::progress::ProgressConfig;
use admitflow::server::{create_router, run_cache_sweeper};
use admitflow::types::AppState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "admitflow=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match env::var("ADMITFLOW_CONFIG") {
        Ok(path) => {
            info!("Loading configuration from {path}");
            ProgressConfig::load_from_file(Path::new(&path))?
        }
        Err(_) => ProgressConfig::default(),
    };

    let addr = env::var("ADMITFLOW_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let sweep_every = config.cache_sweep_interval();
    let state = Arc::new(AppState::new(config));
    tokio::spawn(run_cache_sweeper(state.clone(), sweep_every));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
