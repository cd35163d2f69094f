//! Server mode
//!
//! Starts the redirect server together with the click attribution worker
//! and tears both down in order on Ctrl+C.

use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::DefaultHeaders, web};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::services::{RedirectSettings, redirect_routes};
use crate::config::StaticConfig;
use crate::runtime::lifetime;
use crate::services::ClickAggregator;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let startup = lifetime::startup::prepare_startup(config)
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {:#}", e))?;

    let resolver = startup.resolver.clone();
    let clicks = Arc::new(ClickAggregator::start(
        startup.storage.clone(),
        config.clicks.queue_capacity,
    ));
    let redirect_settings = RedirectSettings::from(&config.links);

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let clicks_for_app = clicks.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(resolver.clone()))
            .app_data(web::Data::new(clicks_for_app.clone()))
            .app_data(web::Data::new(redirect_settings.clone()))
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")))
            .service(redirect_routes())
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .workers(cpu_count)
    .disable_signals();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();
    let handle = server.handle();

    // Wait for server or shutdown signal
    let server_task = tokio::spawn(server);
    tokio::select! {
        res = server_task => {
            res.context("Server task panicked")?.context("Server error")?;
        }
        _ = lifetime::shutdown::wait_for_signal() => {
            handle.stop(true).await;
            info!("HTTP server stopped");
        }
    }

    // 服务器停止后不再有新的点击入队
    lifetime::shutdown::drain_clicks(&clicks).await;
    let stats = clicks.stats();
    info!(
        "Shutdown complete: clicks processed={}, failed={}, dropped={}",
        stats.processed, stats.failed, stats.dropped
    );

    Ok(())
}
