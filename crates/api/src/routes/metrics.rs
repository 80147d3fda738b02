//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use session::SessionTable;

/// State for the metrics route.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
    pub sessions: SessionTable,
}

/// GET /metrics: returns Prometheus-formatted metrics.
///
/// The live session count is sampled on each scrape.
pub async fn get(State(metrics): State<MetricsState>) -> impl IntoResponse {
    metrics::gauge!("sessions_active").set(metrics.sessions.len().await as f64);

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics.handle.render(),
    )
}
