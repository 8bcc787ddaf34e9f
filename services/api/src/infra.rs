use axum::http::HeaderValue;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Build the CORS layer for `BACKEND_CORS_ORIGINS`. Origins that do not
/// parse as header values are skipped with a warning; no configured origins
/// means no CORS layer at all.
pub(crate) fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}

#[cfg(test)]
mod tests {
    use super::cors_layer;

    #[test]
    fn no_origins_means_no_layer() {
        assert!(cors_layer(&[]).is_none());
    }

    #[test]
    fn parseable_origins_build_a_layer() {
        let origins = vec!["https://app.example.org".to_string()];
        assert!(cors_layer(&origins).is_some());
    }

    #[test]
    fn unparseable_origins_are_skipped() {
        let origins = vec!["https://bad\norigin".to_string()];
        assert!(cors_layer(&origins).is_none());
    }
}
