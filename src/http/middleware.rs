use crate::http::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    // Route template keeps generated ids out of the label set
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    state.metrics.http_inflight_requests.inc();

    let response = next.run(request).await;

    state.metrics.http_inflight_requests.dec();

    let duration = start.elapsed();
    let status = response.status().as_u16();

    state
        .metrics
        .record_http_request(&method, &path, status, duration);

    response
}
