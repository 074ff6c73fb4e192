//! Mock responses and the structured error taxonomy.
//!
//! # Responsibilities
//! - Describe a synthesized success response (status, headers, JSON body)
//! - Classify request failures and map them to status codes
//! - Render both as HTTP responses for the tower/axum surfaces

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;

/// A synthesized response.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` for bodiless responses such as 204.
    pub body: Option<Value>,
}

impl MockResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// 200 OK with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: axum::http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        // 204 never carries a body on the wire, even if a shaper set one
        let mut response = match self.body {
            Some(body) if self.status != StatusCode::NO_CONTENT => (self.status, Json(body)).into_response(),
            _ => self.status.into_response(),
        };
        response.headers_mut().extend(self.headers);
        response
    }
}

/// Failures surfaced to the caller as error responses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MockError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    /// Unexpected failure while handling a request, including callback errors.
    #[error("{0}")]
    Internal(String),

    /// Arbitrary status chosen by a response shaper.
    #[error("{message}")]
    Custom { status: StatusCode, message: String },
}

impl MockError {
    pub fn status(&self) -> StatusCode {
        match self {
            MockError::NotFound(_) => StatusCode::NOT_FOUND,
            MockError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            MockError::Conflict(_) => StatusCode::CONFLICT,
            MockError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MockError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MockError::Custom { status, .. } => *status,
        }
    }

    /// Structured `{status, status_text, headers, body}` form of this error.
    pub fn to_error_response(&self) -> ErrorResponse {
        let status = self.status();
        ErrorResponse {
            status,
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            headers: HeaderMap::new(),
            body: self.to_string(),
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        self.to_error_response().into_response()
    }
}

/// Error as delivered to the caller.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    /// The error message.
    pub body: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        response.headers_mut().extend(self.headers);
        response
    }
}
