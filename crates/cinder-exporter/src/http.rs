//! HTTP surface: `/metrics` and a landing page.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;

use cinder_metrics::{AggregatingExporter, CONTENT_TYPE};

const INDEX_HTML: &str = "<html>\n\
<head><title>Cinder Exporter</title></head>\n\
<body>\n\
<h1>Cinder Exporter</h1>\n\
<p><a href=\"/metrics\">Metrics</a></p>\n\
</body>\n\
</html>\n";

/// Shared state for handlers.
#[derive(Clone)]
pub struct HttpState {
    pub exporter: Arc<AggregatingExporter>,
}

pub fn build_router(exporter: Arc<AggregatingExporter>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .with_state(HttpState { exporter })
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Render the latest published snapshots. Never touches upstream.
pub async fn metrics(State(state): State<HttpState>) -> impl IntoResponse {
    let body = state.exporter.render();
    (StatusCode::OK, [("content-type", CONTENT_TYPE)], body)
}
