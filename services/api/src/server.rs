use crate::cli::ServeArgs;
use crate::infra::{load_catalog, read_json, sample_application, AppState};
use crate::routes::with_underwriting_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lender_match::config::AppConfig;
use lender_match::error::AppError;
use lender_match::telemetry;
use lender_match::workflows::underwriting::{
    InMemoryUnderwritingRepository, LoanApplication, UnderwritingError, UnderwritingService,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.underwriting.catalog_path = Some(catalog);
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(config.underwriting.catalog_path.as_deref())?;
    info!(policies = catalog.len(), "policy catalog loaded");

    let applications: Vec<LoanApplication> = match args.applications.take() {
        Some(path) => read_json(&path)?,
        None => vec![sample_application(712)],
    };

    let repository = Arc::new(InMemoryUnderwritingRepository::with_catalog(catalog));
    for application in applications {
        repository
            .add_application(application)
            .map_err(UnderwritingError::from)?;
    }
    let underwriting_service = Arc::new(UnderwritingService::new(repository));

    let app = with_underwriting_routes(underwriting_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lender matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
