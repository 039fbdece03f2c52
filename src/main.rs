//! Crypto News Aggregator — Binary Entrypoint
//! Boots the Axum HTTP server: catalog, fan-out service, notification
//! dispatcher, and the Prometheus recorder.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_news_aggregator::api::{create_router, AppState};
use crypto_news_aggregator::catalog::SourceCatalog;
use crypto_news_aggregator::metrics::Metrics;
use crypto_news_aggregator::notify::{spawn_dispatcher, NotifierMux};
use crypto_news_aggregator::service::NewsService;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let catalog = SourceCatalog::load_default()?;

    let (notify_tx, _dispatcher) = spawn_dispatcher(NotifierMux::from_env());
    let service = Arc::new(NewsService::new(catalog, Some(notify_tx)));

    let metrics = Metrics::init(crypto_news_aggregator::cache::ttl_secs_from_env());

    let router = create_router(AppState { service }).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
