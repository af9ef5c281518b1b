use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::auth::{AuthGate, SessionManager};
use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::http::{web_router, AppState, Views, WebState};
use crate::incidents::IncidentService;
use crate::notify::{LogNotifier, Notifier, SmtpNotifier};
use crate::store::SqliteStore;
use crate::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = Arc::new(SqliteStore::open(&config.database.path)?);

    match config.notifier.smtp.clone() {
        Some(smtp) => {
            let notifier = Arc::new(SmtpNotifier::from_config(&smtp)?);
            serve(config, store, notifier).await
        }
        None => serve(config, store, Arc::new(LogNotifier)).await,
    }
}

async fn serve<N>(
    config: AppConfig,
    store: Arc<SqliteStore>,
    notifier: Arc<N>,
) -> Result<(), AppError>
where
    N: Notifier + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let sessions = Arc::new(SessionManager::new(&config.session.secret));
    let views = Arc::new(Views::new()?);
    let auth = Arc::new(AuthGate::new(store.clone(), sessions.clone()));
    let incidents = Arc::new(IncidentService::new(
        store,
        notifier,
        config.notifier.recipient.clone(),
    ));

    let web_state = WebState {
        auth,
        incidents,
        sessions,
        views,
    };

    let app = web_router(web_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "incident desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}
