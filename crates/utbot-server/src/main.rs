//! UTBot entrypoint: wire the adapter, session, engine, coordinator,
//! and poll loop, then serve the webhook surface.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use utbot_core::SignalEngine;
use utbot_trading::{
    Broker, Config, Coordinator, Poller, ReqwestHttpClient, SessionManager, TradovateBroker,
};

mod routes;

use routes::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(symbol = %config.symbol, base_url = %config.base_url, "starting utbot");

    let http_client = Arc::new(ReqwestHttpClient::new());
    let broker: Arc<dyn Broker> = Arc::new(
        TradovateBroker::new(
            http_client,
            config.base_url.clone(),
            config.username.clone(),
            config.password.clone(),
        )
        .with_timeout(config.http_timeout),
    );

    let session = Arc::new(SessionManager::with_ttl(broker.clone(), config.session_ttl));
    let engine = SignalEngine::new(config.lookback, config.key_value)?;
    let coordinator = Arc::new(Coordinator::new(
        broker.clone(),
        session.clone(),
        config.symbol.clone(),
        config.qty,
    ));

    let poller = Poller::new(
        broker,
        session.clone(),
        coordinator.clone(),
        engine,
        config.poll_interval,
    );
    tokio::spawn(poller.run());

    let state = AppState {
        coordinator,
        session,
        webhook_secret: config.webhook_secret.clone(),
    };
    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "webhook surface listening");
    axum::serve(listener, router).await?;

    Ok(())
}
