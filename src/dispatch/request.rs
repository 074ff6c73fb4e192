//! Intercepted request representation.
//!
//! # Responsibilities
//! - Carry method, URL, query, headers and JSON body of an outgoing request
//! - Split an inline query string off the URL
//! - Produce the normalized URL used for route matching

use std::collections::BTreeMap;

use axum::http::{request::Parts, HeaderMap, Method};
use serde_json::Value;

use crate::dispatch::response::MockError;

/// Multi-valued query parameters, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Self {
        let mut params = Self::new();
        params.extend_from_str(query);
        params
    }

    fn extend_from_str(&mut self, query: &str) {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            self.append(key.into_owned(), value.into_owned());
        }
    }

    /// Add a value, keeping earlier values for the same key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    /// All values for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.params.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// An outgoing HTTP request captured before it reaches the network.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute or root-relative URL, without query string.
    pub url: String,
    /// Query parameters, including any that were inlined in the URL.
    pub query: QueryParams,
    /// Request headers.
    pub headers: HeaderMap,
    /// Parsed JSON body.
    pub body: Option<Value>,
}

impl InterceptedRequest {
    /// Create a request. A `?query` suffix on `url` is moved into `query`,
    /// a `#fragment` is dropped.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let mut url: String = url.into();
        if let Some(pos) = url.find('#') {
            url.truncate(pos);
        }
        let mut query = QueryParams::new();
        if let Some(pos) = url.find('?') {
            query.extend_from_str(&url[pos + 1..]);
            url.truncate(pos);
        }
        Self {
            method,
            url,
            query,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, url).with_body(body)
    }

    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, url).with_body(body)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.append(key, value);
        self
    }

    /// URL used for matching: no leading slash, no trailing slash.
    pub fn normalized_url(&self) -> &str {
        let url = self.url.strip_prefix('/').unwrap_or(&self.url);
        url.trim_end_matches('/')
    }

    /// Value of the `x-request-id` header, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get("x-request-id").and_then(|v| v.to_str().ok())
    }

    /// Build from the head and buffered body of an `http` request.
    ///
    /// Absolute-form URIs keep their scheme and authority so host-qualified
    /// routes can match them. An empty body is `None`; a non-empty body must
    /// be JSON.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Result<Self, MockError> {
        let uri = &parts.uri;
        let url = match (uri.scheme_str(), uri.authority()) {
            (Some(scheme), Some(authority)) => format!("{}://{}{}", scheme, authority, uri.path()),
            _ => uri.path().to_string(),
        };

        let mut request = Self::new(parts.method.clone(), url).with_headers(parts.headers.clone());
        if let Some(query) = uri.query() {
            request.query = QueryParams::parse(query);
        }
        if !body.is_empty() {
            let value = serde_json::from_slice(body)
                .map_err(|e| MockError::BadRequest(format!("request body is not valid JSON: {}", e)))?;
            request.body = Some(value);
        }
        Ok(request)
    }
}
