use crate::cli::ServeArgs;
use crate::infra::{seed_demo_world, AppState, LogNotifier};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use prestalink::config::AppConfig;
use prestalink::error::AppError;
use prestalink::identity::StaticDirectory;
use prestalink::marketplace::{Marketplace, MemoryStore};
use prestalink::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(StaticDirectory::new());
    let world = seed_demo_world(&store, &directory);
    info!(
        client = %world.client.name,
        providers = 2,
        "seeded demo accounts"
    );

    let marketplace = Arc::new(Marketplace::new(
        store,
        directory,
        Arc::new(LogNotifier),
    ));

    let app = with_marketplace_routes(marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "prestalink marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}
