use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;

mod config;
mod routes;
mod schema;
mod store;

use store::ActivityStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env()?;

    let store = Arc::new(store::PgStore::new());
    tracing::info!("connecting to the activity store");
    store.connect(&config.database_url).await?;

    // startup check: report how many records the store already holds
    match store.find_all().await {
        Ok(records) if !records.is_empty() => {
            tracing::info!(count = records.len(), "records already exist in store");
        }
        Ok(_) => tracing::info!("no records exist in store yet"),
        Err(e) => tracing::warn!(error = %e, "could not count existing records"),
    }

    let app = routes::router(store.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
