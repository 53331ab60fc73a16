//! Error types for the web server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Lifecycle errors returned from [`WebServer::start`](super::WebServer::start)
/// and [`WebServer::stop`](super::WebServer::stop)
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("server already running")]
    AlreadyRunning,

    #[error("listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("shutdown server: {0}")]
    Shutdown(String),
}

/// Request-level errors, answered with a plain-text body
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
