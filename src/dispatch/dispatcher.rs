//! Request dispatcher: the `ApiMock` entry point.
//!
//! # Responsibilities
//! - Hold the validated route table and swap it on registration
//! - Drive a request through root lookup, dry match, chain resolution,
//!   parent resolution, verb execution and response shaping
//! - Apply the artificial delay to successful responses only
//! - Hand unmatched requests back for passthrough when configured

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::http::{header, HeaderValue, StatusCode};
use serde_json::Value;

use crate::config::schema::{ApiMockConfig, MockConfig};
use crate::dispatch::request::InterceptedRequest;
use crate::dispatch::response::{MockError, MockResponse};
use crate::dispatch::verbs::{self, VerbContext};
use crate::observability::metrics;
use crate::routing::chain::{resolve_chain, ChainParam};
use crate::routing::index::{build_index, find_group_index, RootRoute};
use crate::routing::matcher::dry_match;
use crate::routing::registry::CallbackRegistry;
use crate::routing::route::{RouteGroup, ShapeContext, Shaped};
use crate::routing::validator::{root_key, RouteValidator, ValidationError};
use crate::store::cache::{LoadContext, ResourceStore};
use crate::store::collection::Record;
use crate::store::persistence::{FileBackend, PersistentCache, StorageBackend};

/// What [`ApiMock::intercept`] decided for a request.
#[derive(Debug)]
pub enum Outcome {
    /// Synthesized response, delivered after the configured delay.
    Mocked(MockResponse),
    /// No route matched; send the request to the real transport.
    Passthrough(InterceptedRequest),
}

/// Immutable snapshot of the registered routes.
#[derive(Debug)]
struct RouteTable {
    groups: Vec<RouteGroup>,
    index: Vec<RootRoute>,
}

impl RouteTable {
    fn new(groups: Vec<RouteGroup>) -> Self {
        let index = build_index(&groups);
        Self { groups, index }
    }

    fn resolve<'a>(&'a self, url: &'a str) -> Option<Vec<ChainParam<'a>>> {
        let group = &self.groups[find_group_index(&self.index, url)?];
        resolve_chain(&dry_match(url, group)?)
    }
}

/// In-process REST backend emulation.
#[derive(Debug)]
pub struct ApiMock {
    config: ApiMockConfig,
    table: ArcSwap<RouteTable>,
    validator: Mutex<RouteValidator>,
    store: ResourceStore,
}

impl ApiMock {
    /// Validate `groups` and build the mock. Collections are persisted to
    /// `storage_dir` when `cache_to_external_storage` is set.
    pub fn new(config: ApiMockConfig, groups: Vec<RouteGroup>) -> Result<Self, ValidationError> {
        let backend = config
            .cache_to_external_storage
            .then(|| Box::new(FileBackend::new(&config.storage_dir)) as Box<dyn StorageBackend>);
        Self::with_backend(config, groups, backend)
    }

    /// Like [`ApiMock::new`], persisting to `backend` when one is given.
    pub fn with_backend(
        config: ApiMockConfig,
        groups: Vec<RouteGroup>,
        backend: Option<Box<dyn StorageBackend>>,
    ) -> Result<Self, ValidationError> {
        let mut validator = RouteValidator::new();
        let groups = validator.validate(groups)?;

        if config.case_sensitive_search {
            tracing::debug!("case_sensitive_search has no effect, matching is always case-sensitive");
        }

        let persistence = backend.map(|backend| PersistentCache::new(backend, config.external_storage_key.clone()));

        tracing::info!(
            groups = groups.len(),
            delay_ms = config.delay_ms,
            persistence = persistence.is_some(),
            "API mock initialized"
        );

        Ok(Self {
            table: ArcSwap::from_pointee(RouteTable::new(groups)),
            validator: Mutex::new(validator),
            store: ResourceStore::new(persistence),
            config,
        })
    }

    /// Build from a loaded config file, resolving named callbacks via `registry`.
    pub fn from_config(config: &MockConfig, registry: &CallbackRegistry) -> Result<Self, ValidationError> {
        let groups = registry.build_groups(&config.groups)?;
        Self::new(config.mock.clone(), groups)
    }

    pub fn config(&self) -> &ApiMockConfig {
        &self.config
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Number of registered route groups.
    pub fn group_count(&self) -> usize {
        self.table.load().groups.len()
    }

    /// Whether some registered route addresses the URL of `request`.
    pub fn matches(&self, request: &InterceptedRequest) -> bool {
        self.table.load().resolve(request.normalized_url()).is_some()
    }

    /// Add route groups at runtime.
    ///
    /// Groups identical to already registered ones are accepted without
    /// change; a different group reusing a registered root is rejected.
    pub fn register(&self, groups: Vec<RouteGroup>) -> Result<(), ValidationError> {
        let mut validator = self.validator.lock().unwrap_or_else(PoisonError::into_inner);
        let groups = validator.validate(groups)?;

        let current = self.table.load();
        let mut merged = current.groups.clone();
        for group in groups {
            let root = root_key(&group);
            match merged.iter().position(|existing| root_key(existing) == root) {
                Some(pos) => merged[pos] = group,
                None => merged.push(group),
            }
        }

        tracing::info!(groups = merged.len(), "Route table updated");
        self.table.store(Arc::new(RouteTable::new(merged)));
        Ok(())
    }

    /// Intercept `request`.
    ///
    /// Mocked responses are returned after the configured delay, errors
    /// immediately. Cancelling the returned future during the delay does not
    /// undo mutations already applied.
    pub async fn intercept(&self, request: InterceptedRequest) -> Result<Outcome, MockError> {
        let start = Instant::now();
        let method = request.method.to_string();

        match self.dispatch(&request) {
            Ok(Some(response)) => {
                self.log_summary(&request, response.status.as_u16(), start);
                if self.config.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
                }
                metrics::record_request(&method, response.status.as_u16(), "mocked", start);
                Ok(Outcome::Mocked(response))
            }
            Ok(None) if self.config.pass_through_unknown_url => {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    request_id = request.request_id().unwrap_or("-"),
                    "No route matched, passing through"
                );
                metrics::record_passthrough();
                Ok(Outcome::Passthrough(request))
            }
            Ok(None) => {
                let err = MockError::NotFound(format!("no mock route matches {} {}", request.method, request.url));
                self.log_summary(&request, err.status().as_u16(), start);
                metrics::record_request(&method, err.status().as_u16(), "unmatched", start);
                Err(err)
            }
            Err(err) => {
                self.log_summary(&request, err.status().as_u16(), start);
                metrics::record_request(&method, err.status().as_u16(), "error", start);
                Err(err)
            }
        }
    }

    /// Synchronous core of [`ApiMock::intercept`], without delay.
    ///
    /// `Ok(None)` means no route matched. Panics in user callbacks are
    /// turned into internal errors.
    pub fn dispatch(&self, request: &InterceptedRequest) -> Result<Option<MockResponse>, MockError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.execute(request))).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "callback panicked".to_string());
            tracing::error!(method = %request.method, url = %request.url, error = %message, "Request handling panicked");
            Err(MockError::Internal(message))
        })
    }

    fn execute(&self, request: &InterceptedRequest) -> Result<Option<MockResponse>, MockError> {
        let table = self.table.load();
        let url = request.normalized_url();

        // 1. Locate root route, dry match, resolve chain
        let Some(chain) = table.resolve(url) else {
            return Ok(None);
        };
        let Some((target, ancestors)) = chain.split_last() else {
            return Ok(None);
        };

        // 2. Resolve parents
        let mut parents: Vec<Record> = Vec::with_capacity(ancestors.len());
        for param in ancestors {
            let item = self.resolve_parent(param, request, &parents)?;
            parents.push(item);
        }

        // 3. Execute verb
        let mut response = self.execute_verb(target, request, &parents)?;

        // 4. Shape response
        if let Some(shaper) = target.route.response_shaper() {
            let ctx = ShapeContext {
                body: response.body.clone().unwrap_or_else(|| Value::Array(Vec::new())),
                item_id: target.resource_id.as_deref(),
                method: &request.method,
                parents: parents.clone(),
                query: &request.query,
                request_body: request.body.clone(),
            };
            let shaped = shaper.shape(ctx).map_err(|e| {
                tracing::error!(route = %target.route.path(), error = %e, "Response callback failed");
                MockError::Internal(e.to_string())
            })?;
            match shaped {
                Shaped::Body(body) => response.body = Some(body),
                Shaped::Response(custom) => response = custom,
                Shaped::Error(err) => return Err(err),
            }
        }

        Ok(Some(response))
    }

    fn load_context<'a>(&self, request: &'a InterceptedRequest, parents: &'a [Record]) -> LoadContext<'a> {
        LoadContext {
            method: &request.method,
            parents,
            query: &request.query,
            body: request.body.as_ref(),
        }
    }

    fn resolve_parent(
        &self,
        param: &ChainParam<'_>,
        request: &InterceptedRequest,
        parents: &[Record],
    ) -> Result<Record, MockError> {
        let (Some(primary_key), Some(id)) = (param.primary_key.as_deref(), param.resource_id.as_deref()) else {
            return Err(MockError::Internal(format!(
                "parent route `{}` has no primary key",
                param.route.path()
            )));
        };

        let handle = self.store.get_or_load(param, &self.load_context(request, parents))?;
        let item = handle.lock().find(primary_key, id).cloned();
        item.ok_or_else(|| MockError::NotFound(format!("item {}={} not found", primary_key, id)))
    }

    fn execute_verb(
        &self,
        target: &ChainParam<'_>,
        request: &InterceptedRequest,
        parents: &[Record],
    ) -> Result<MockResponse, MockError> {
        // Routes without data serve an empty list
        let (Some(_), Some(primary_key)) = (target.route.data_provider(), target.primary_key.as_deref()) else {
            return Ok(MockResponse::ok(Value::Array(Vec::new())));
        };

        let handle = self.store.get_or_load(target, &self.load_context(request, parents))?;
        let mut collection = handle.lock();

        let url = request.url.trim_end_matches('/');
        let ctx = VerbContext {
            method: &request.method,
            url,
            primary_key,
            resource_id: target.resource_id.as_deref(),
            body: request.body.as_ref(),
            policy: &self.config,
        };
        let outcome = verbs::execute(&ctx, &collection)?;
        if let Some(writable) = outcome.writable {
            self.store.commit(handle.cache_key(), &mut collection, writable);
        }
        drop(collection);

        let mut response = MockResponse::new(outcome.status);
        if outcome.status != StatusCode::NO_CONTENT {
            response.body = Some(Value::Array(outcome.items.into_iter().map(Value::Object).collect()));
        }
        if let Some(location) = outcome.location {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    response.headers.insert(header::LOCATION, value);
                }
                Err(_) => tracing::warn!(location = %location, "Skipping invalid Location header"),
            }
        }
        Ok(response)
    }

    fn log_summary(&self, request: &InterceptedRequest, status: u16, start: Instant) {
        let request_id = request.request_id().unwrap_or("-");
        let elapsed = start.elapsed();
        if self.config.show_log {
            tracing::info!(method = %request.method, url = %request.url, status, request_id, ?elapsed, "API mock");
        } else {
            tracing::debug!(method = %request.method, url = %request.url, status, request_id, ?elapsed, "API mock");
        }
    }
}
