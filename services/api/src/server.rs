use crate::cli::ServeArgs;
use crate::infra::{
    load_schema, load_settings, AppState, InMemoryEntryRepository, InMemorySchemaProvider,
    InMemorySettingsStore,
};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use location_gate::config::AppConfig;
use location_gate::error::AppError;
use location_gate::telemetry;
use location_gate::workflows::allowlist::LocationGateService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let schema = match config.gate.schema_path.as_deref() {
        Some(path) => load_schema(path)?,
        None => {
            warn!("GATE_SCHEMA_PATH not set; no forms will be targeted");
            InMemorySchemaProvider::default()
        }
    };

    let service = LocationGateService::new(
        Arc::new(InMemorySettingsStore::default()),
        Arc::new(schema),
        Arc::new(InMemoryEntryRepository::default()),
    );
    if let Some(path) = config.gate.settings_path.as_deref() {
        service.save_settings(load_settings(path)?)?;
    }

    let app = with_operational_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "location gate ready");

    axum::serve(listener, app).await?;
    Ok(())
}
