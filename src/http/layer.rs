//! Tower middleware that puts the API mock in front of a real transport.
//!
//! # Responsibilities
//! - Buffer the body of requests the mock owns and convert them
//! - Answer mocked requests directly
//! - Forward passthrough requests, body intact, to the wrapped service

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::dispatch::{ApiMock, InterceptedRequest, MockError, Outcome};

/// Default cap on buffered request bodies.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Layer producing [`MockService`].
#[derive(Debug, Clone)]
pub struct MockLayer {
    mock: Arc<ApiMock>,
    body_limit: usize,
}

impl MockLayer {
    pub fn new(mock: Arc<ApiMock>) -> Self {
        Self {
            mock,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    #[must_use]
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<S> Layer<S> for MockLayer {
    type Service = MockService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockService {
            inner,
            mock: self.mock.clone(),
            body_limit: self.body_limit,
        }
    }
}

/// Intercepts requests; unmatched ones reach `inner` when passthrough is on.
#[derive(Debug, Clone)]
pub struct MockService<S> {
    inner: S,
    mock: Arc<ApiMock>,
    body_limit: usize,
}

impl<S> Service<Request<Body>> for MockService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let mock = self.mock.clone();
        let body_limit = self.body_limit;

        Box::pin(async move {
            let (parts, body) = request.into_parts();

            // Unowned URLs keep their body unread, whatever its size or format
            if mock.config().pass_through_unknown_url {
                if let Ok(bare) = InterceptedRequest::from_parts(&parts, &[]) {
                    if !mock.matches(&bare) {
                        return match mock.intercept(bare).await {
                            Ok(Outcome::Mocked(response)) => Ok(response.into_response()),
                            Ok(Outcome::Passthrough(_)) => inner.call(Request::from_parts(parts, body)).await,
                            Err(err) => Ok(err.into_response()),
                        };
                    }
                }
            }

            let bytes = match axum::body::to_bytes(body, body_limit).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    let err = MockError::BadRequest(format!("failed to read request body: {}", e));
                    return Ok(err.into_response());
                }
            };

            let intercepted = match InterceptedRequest::from_parts(&parts, &bytes) {
                Ok(intercepted) => intercepted,
                Err(err) => return Ok(err.into_response()),
            };

            match mock.intercept(intercepted).await {
                Ok(Outcome::Mocked(response)) => Ok(response.into_response()),
                Ok(Outcome::Passthrough(_)) => inner.call(Request::from_parts(parts, Body::from(bytes))).await,
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}
