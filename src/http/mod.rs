pub mod catalog;
pub mod handlers;
pub mod middleware;
pub mod state;

use anyhow::{Context, Result};
use axum::{Router, http::StatusCode, middleware as axum_middleware, routing::get};
use socket2::{Domain, Protocol, Socket, Type};
use state::AppState;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};

pub fn create_router(state: Arc<AppState>) -> Router {
    let config = &state.config;

    // Probes stay outside the middleware stack
    let probe_router = Router::new()
        .route("/healthz", get(handlers::healthz_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state.clone());

    let objects_router = Router::new()
        .route(
            "/objects",
            get(handlers::list_objects_handler).post(handlers::create_object_handler),
        )
        .route(
            "/objects/{id}",
            get(handlers::get_object_handler)
                .put(handlers::update_object_handler)
                .patch(handlers::patch_object_handler)
                .delete(handlers::delete_object_handler),
        )
        .with_state(state.clone())
        // Middleware - applied bottom-up
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track_metrics,
        ))
        .layer(RequestBodyLimitLayer::new(config.stub.body_limit_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.stub_request_timeout(),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Router::new().merge(probe_router).merge(objects_router)
}

/// Bind a TCP listener with the stub's socket options.
pub fn bind(addr: SocketAddr, tcp_nodelay: bool) -> Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .context("Failed to create socket")?;

    socket
        .set_reuse_address(true)
        .context("Failed to set SO_REUSEADDR")?;

    if tcp_nodelay {
        socket
            .set_tcp_nodelay(true)
            .context("Failed to set TCP_NODELAY")?;
    }

    socket
        .set_nonblocking(true)
        .context("Failed to set non-blocking")?;
    socket
        .bind(&addr.into())
        .with_context(|| format!("Failed to bind {addr}"))?;
    socket.listen(1024).context("Failed to listen")?;

    TcpListener::from_std(socket.into()).context("Failed to convert to tokio listener")
}

/// Serve the stub objects service until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    let app = create_router(state);

    info!(addr = %addr, "Stub objects service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Stub objects service error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::state::ObjectStore;
    use crate::metrics::Metrics;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Arc::new(Config::default());
        let store = Arc::new(ObjectStore::seeded());
        let metrics = Arc::new(Metrics::new());
        create_router(Arc::new(AppState::new(config, store, metrics)))
    }

    #[tokio::test]
    async fn test_router_creation() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_repeated_id_query() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/objects?id=1&id=3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let objects: Vec<crate::model::ApiObject> = serde_json::from_slice(&body).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id, "1");
        assert_eq!(objects[1].id, "3");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/objects")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_empty_patch_body_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/objects/does-not-exist")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_unknown_object_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/objects/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
    }
}
