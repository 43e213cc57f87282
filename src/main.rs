use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use marutham::api::server::start_server;
use marutham::api::types::ApiContext;
use marutham::config::{self, Settings};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = match Settings::from_env() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            tracing::error!("Cannot start: {e}");
            std::process::exit(1);
        }
    };

    let ctx = ApiContext::new(settings.clone());

    // The vitals panel polls the feed for as long as the process lives.
    ctx.vitals.start();

    let mut server = match start_server(ctx.clone(), settings.bind_addr).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Cannot start: {e}");
            std::process::exit(1);
        }
    };

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutting down");

    ctx.vitals.stop();
    server.shutdown();
}
