//! Web configuration API
//!
//! REST endpoints for reading and editing the slider mapping, a read-only
//! view of live sessions, and the embedded single-page UI.
//! Default port: 9123

pub mod assets;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
mod server;


use axum::{
    http::{header, HeaderValue},
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::ConfigAccessor;
use crate::sessions::SessionRegistry;

pub use assets::{AssetBundle, MemoryAssets, WebAssets};
pub use error::{ApiError, ServerError};
pub use server::{WebServer, DEFAULT_SERVER_PORT, SHUTDOWN_TIMEOUT};

/// Shared state for API handlers
pub struct ApiState {
    /// Slider mapping source and sink
    pub config: Arc<dyn ConfigAccessor>,
    /// Live session keys
    pub sessions: Arc<dyn SessionRegistry>,
    /// Static UI bundle
    pub assets: Arc<dyn AssetBundle>,
    /// URL reported by /api/status
    pub web_url: String,
}

/// Build the router wrapped in its middleware chain (CORS, then access log)
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/api/sliders",
            get(handlers::list_sliders).fallback(handlers::method_not_allowed),
        )
        .route("/api/sliders/", any(handlers::slider_by_id))
        .route("/api/sliders/*id", any(handlers::slider_by_id))
        .route(
            "/api/sessions",
            get(handlers::list_sessions).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/status",
            get(handlers::status).fallback(handlers::method_not_allowed),
        )
        .fallback(assets::serve_static)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static(middleware::CORS_ALLOW_ORIGIN),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(middleware::CORS_ALLOW_METHODS),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(middleware::CORS_ALLOW_HEADERS),
                ))
                .layer(axum::middleware::from_fn(middleware::short_circuit_options))
                .layer(axum::middleware::from_fn(middleware::log_requests)),
        )
        .with_state(state)
}
