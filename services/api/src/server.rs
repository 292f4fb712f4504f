use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use listing_desk::config::AppConfig;
use listing_desk::error::AppError;
use listing_desk::telemetry;
use tokio::signal;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::infra::{in_memory_desk, AppState};
use crate::routes::with_marketplace_routes;

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    let ServeArgs { host, port } = args;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (metrics_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let ready = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: ready.clone(),
        metrics: Arc::new(metrics_handle),
    };

    let (desk, _) = in_memory_desk(&config.marketplace);
    let app = with_marketplace_routes(Arc::new(desk))
        .layer(Extension(state))
        .layer(metrics_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    ready.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        post_fee = config.marketplace.fees.post_listing,
        takeover_fee = config.marketplace.fees.takeover,
        "listing desk ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(ready))
        .await?;

    info!("listing desk stopped");
    Ok(())
}

/// Resolves on ctrl-c after clearing readiness.
async fn shutdown_signal(ready: Arc<AtomicBool>) {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    ready.store(false, Ordering::Release);
    info!("shutdown signal received");
}
