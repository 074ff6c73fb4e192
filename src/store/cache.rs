//! Resource store: process-wide map from cache key to collection.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::Method;
use dashmap::DashMap;
use serde_json::Value;

use crate::dispatch::request::QueryParams;
use crate::dispatch::response::MockError;
use crate::observability::metrics;
use crate::routing::chain::ChainParam;
use crate::routing::route::{DataContext, Route};
use crate::store::collection::{CachedCollection, Record};
use crate::store::persistence::PersistentCache;

/// Request context handed to data providers.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    pub method: &'a Method,
    pub parents: &'a [Record],
    pub query: &'a QueryParams,
    pub body: Option<&'a Value>,
}

/// A collection slot. Inserted empty, filled under its own lock.
#[derive(Debug, Default)]
struct Slot {
    loaded: bool,
    collection: CachedCollection,
}

/// Locked collection.
pub struct CollectionGuard<'a>(MutexGuard<'a, Slot>);

impl Deref for CollectionGuard<'_> {
    type Target = CachedCollection;

    fn deref(&self) -> &CachedCollection {
        &self.0.collection
    }
}

impl DerefMut for CollectionGuard<'_> {
    fn deref_mut(&mut self) -> &mut CachedCollection {
        &mut self.0.collection
    }
}

/// Shared handle on one cached collection.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    cache_key: String,
    cell: Arc<Mutex<Slot>>,
}

impl CollectionHandle {
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Lock the collection. A poisoned lock is recovered: collections are
    /// only ever replaced wholesale, so a panicking holder cannot leave
    /// them half-written.
    pub fn lock(&self) -> CollectionGuard<'_> {
        CollectionGuard(self.cell.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Lazily populated collections, optionally backed by external storage.
///
/// The map only hands out slots; providers and storage I/O run under the
/// slot's own lock, so a slow or re-entrant provider never blocks other keys.
#[derive(Debug, Default)]
pub struct ResourceStore {
    entries: DashMap<String, Arc<Mutex<Slot>>>,
    persistence: Option<PersistentCache>,
}

impl ResourceStore {
    pub fn new(persistence: Option<PersistentCache>) -> Self {
        Self {
            entries: DashMap::new(),
            persistence,
        }
    }

    /// Collection for `param`, loading it on first access.
    ///
    /// A miss is served from external storage when enabled, otherwise by
    /// calling the route's data provider with an empty collection. Refresh
    /// routes re-run their provider on every later access too. A failed
    /// load leaves the slot empty and is retried on the next access.
    pub fn get_or_load(&self, param: &ChainParam<'_>, ctx: &LoadContext<'_>) -> Result<CollectionHandle, MockError> {
        let route = param.route;
        let cache_key = param.cache_key.clone();

        // Shard lock is released at the end of this statement
        let cell = self.entries.entry(cache_key.clone()).or_default().clone();

        let mut slot = cell.lock().unwrap_or_else(PoisonError::into_inner);
        if !slot.loaded {
            let items = self.load(route, &cache_key, ctx)?;
            slot.collection = CachedCollection::new(items, route.list_properties().map(<[String]>::to_vec));
            slot.loaded = true;
            metrics::record_collections(self.entries.len());
        } else if route.is_refresh() {
            let items = provide(route, slot.collection.writable().to_vec(), param.resource_id.as_deref(), ctx)?;
            self.commit(&cache_key, &mut slot.collection, items);
        }
        drop(slot);

        Ok(CollectionHandle { cache_key, cell })
    }

    fn load(&self, route: &Route, cache_key: &str, ctx: &LoadContext<'_>) -> Result<Vec<Record>, MockError> {
        if let Some(items) = self.persistence.as_ref().and_then(|p| p.load(cache_key)) {
            tracing::debug!(cache_key = %cache_key, "Rehydrated collection");
            return Ok(items);
        }

        let items = provide(route, Vec::new(), None, &LoadContext { method: &Method::GET, ..*ctx })?;
        if let Some(persistence) = &self.persistence {
            persistence.save(cache_key, &items);
        }
        Ok(items)
    }

    /// Replace the writable items of a locked collection and persist them.
    pub fn commit(&self, cache_key: &str, collection: &mut CachedCollection, writable: Vec<Record>) {
        collection.replace(writable);
        if let Some(persistence) = &self.persistence {
            persistence.save(cache_key, collection.writable());
        }
    }

    /// Copy of the collection stored under `cache_key`, once loaded.
    pub fn snapshot(&self, cache_key: &str) -> Option<CachedCollection> {
        let cell = self.entries.get(cache_key)?.clone();
        let slot = cell.lock().unwrap_or_else(PoisonError::into_inner);
        slot.loaded.then(|| slot.collection.clone())
    }

    /// Number of cache keys seen, including ones whose load failed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn provide(
    route: &Route,
    items: Vec<Record>,
    item_id: Option<&str>,
    ctx: &LoadContext<'_>,
) -> Result<Vec<Record>, MockError> {
    let provider = route
        .data_provider()
        .ok_or_else(|| MockError::Internal(format!("route `{}` has no data callback", route.path())))?;

    provider
        .provide(DataContext {
            items,
            item_id,
            method: ctx.method,
            parents: ctx.parents,
            query: ctx.query,
            body: ctx.body,
        })
        .map_err(|e| {
            tracing::error!(route = %route.path(), error = %e, "Data callback failed");
            MockError::Internal(e.to_string())
        })
}
