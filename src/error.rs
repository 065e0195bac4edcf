//! Error types for the request pipeline.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};

use crate::routing::{PathError, UpstreamUrlError};
use crate::upstream::FetchError;

/// Body of every 502.
pub const BAD_GATEWAY_BODY: &str = "Failed to fetch target URL";

/// A request the pipeline could not serve.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    UpstreamUrl(#[from] UpstreamUrlError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("upstream answered {0}")]
    UpstreamStatus(StatusCode),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::Path(_) => StatusCode::FORBIDDEN,
            ProxyError::UpstreamUrl(_) | ProxyError::Fetch(_) | ProxyError::UpstreamStatus(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ProxyError::MethodNotAllowed(_) => String::new(),
            ProxyError::Path(e) => e.to_string(),
            _ => BAD_GATEWAY_BODY.to_string(),
        };

        let mut response = (status, body).into_response();
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        if matches!(self, ProxyError::MethodNotAllowed(_)) {
            headers.remove(header::CONTENT_TYPE);
        } else {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        }
        response
    }
}

/// Failures building the pipeline at startup.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid upstream base url: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
}
