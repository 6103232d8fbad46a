use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{seed_workforce, AppState, InMemoryNotifier, InMemoryVacationStore, UnitDirectory};
use crate::routes::with_vacation_routes;
use ferias::config::AppConfig;
use ferias::error::AppError;
use ferias::telemetry;
use ferias::workflows::vacation::VacationService;

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

    let store = Arc::new(InMemoryVacationStore::default());
    let directory = Arc::new(UnitDirectory::default());
    let notifier = Arc::new(InMemoryNotifier::default());
    seed_workforce(&store, &directory);
    let vacation_service = Arc::new(VacationService::new(store, directory, notifier));

    let app = with_vacation_routes(vacation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "vacation approval service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
