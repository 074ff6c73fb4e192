//! Real transport for requests the mock passes through.
//!
//! # Responsibilities
//! - Rewrite origin-form URIs onto the configured upstream base
//! - Forward absolute-form URIs unchanged
//! - Map transport failures to 502 responses

use std::convert::Infallible;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::Service;

/// Forwarding client, cheap to clone.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    base: Option<(Scheme, Authority)>,
}

impl Upstream {
    /// Forward to `base` (e.g. `http://127.0.0.1:8080`), or only absolute-form
    /// requests when `None`.
    pub fn new(base: Option<&str>) -> Result<Self, axum::http::uri::InvalidUri> {
        let base = match base {
            Some(base) => {
                let uri: Uri = base.parse()?;
                match uri.into_parts() {
                    axum::http::uri::Parts {
                        scheme: Some(scheme),
                        authority: Some(authority),
                        ..
                    } => Some((scheme, authority)),
                    // Relative bases cannot be dialed
                    _ => None,
                }
            }
            None => None,
        };

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { client, base })
    }

    /// Target URI for `uri`, or `None` if there is nowhere to send it.
    fn target(&self, uri: &Uri) -> Option<Uri> {
        if uri.scheme().is_some() && uri.authority().is_some() {
            return Some(uri.clone());
        }
        let (scheme, authority) = self.base.clone()?;
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(scheme);
        parts.authority = Some(authority);
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Uri::from_parts(parts).ok()
    }

    async fn forward(self, request: Request<Body>) -> Response {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        let Some(uri) = self.target(request.uri()) else {
            tracing::warn!(request_id = %request_id, uri = %request.uri(), "No upstream configured for passthrough");
            return (StatusCode::BAD_GATEWAY, "no upstream configured").into_response();
        };

        let (mut parts, body) = request.into_parts();
        parts.uri = uri;
        // hyper derives Host from the URI
        parts.headers.remove(axum::http::header::HOST);

        tracing::debug!(request_id = %request_id, uri = %parts.uri, "Forwarding request upstream");

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

impl Service<Request<Body>> for Upstream {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let upstream = self.clone();
        Box::pin(async move { Ok(upstream.forward(request).await) })
    }
}
