use crate::cli::ServeArgs;
use crate::infra::{cors_layer, AppState};
use crate::routes::with_review_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use compliance_ai::config::AppConfig;
use compliance_ai::error::AppError;
use compliance_ai::review::{
    ComplianceReviewService, ProviderFactory, ReferenceCatalogue, ReferenceMatcher, ReviewApi,
};
use compliance_ai::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    // Catalogue load is the one startup step that may refuse to serve.
    let catalogue = ReferenceCatalogue::load(config.review.reference_dir.as_deref())?;
    info!(references = catalogue.len(), "compliance catalogue loaded");

    let matcher = ReferenceMatcher::new(catalogue, config.review.min_match_confidence);
    let factory = Arc::new(ProviderFactory::new(config.review.processor.clone()));
    let service = Arc::new(ComplianceReviewService::new(
        matcher,
        factory,
        config.review.review_budget,
    ));

    let api = ReviewApi {
        service,
        project_name: config.http.project_name.clone(),
    };

    let mut app = with_review_routes(api, &config.http.api_v1_prefix)
        .layer(Extension(app_state))
        .layer(prometheus_layer);
    if let Some(cors) = cors_layer(&config.http.cors_origins) {
        app = app.layer(cors);
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "compliance review service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
