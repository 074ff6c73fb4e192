//! Cached collections and their list projection.
//!
//! # Responsibilities
//! - Hold the writable (authoritative) items of one collection
//! - Derive the read view served for collection-level GETs
//! - Compare stored primary keys against URL ids
//!
//! # Design Decisions
//! - The read view is rebuilt eagerly on every replacement, never patched
//! - Ids are compared by their string rendering, so `1` matches `"1"`

use serde_json::{Map, Value};

/// A single resource item.
pub type Record = Map<String, Value>;

/// Writable items of a collection plus the derived read view.
#[derive(Debug, Clone, Default)]
pub struct CachedCollection {
    writable: Vec<Record>,
    readonly: Vec<Record>,
    properties_for_list: Option<Vec<String>>,
}

impl CachedCollection {
    /// Wrap loaded items and derive the read view.
    pub fn new(writable: Vec<Record>, properties_for_list: Option<Vec<String>>) -> Self {
        let readonly = project(&writable, properties_for_list.as_deref());
        Self {
            writable,
            readonly,
            properties_for_list,
        }
    }

    /// The authoritative items.
    pub fn writable(&self) -> &[Record] {
        &self.writable
    }

    /// The list view, one entry per writable item in the same order.
    pub fn readonly(&self) -> &[Record] {
        &self.readonly
    }

    /// Replace the writable items and rebuild the read view.
    pub fn replace(&mut self, writable: Vec<Record>) {
        self.readonly = project(&writable, self.properties_for_list.as_deref());
        self.writable = writable;
    }

    /// Position of the item whose `primary_key` matches `id`.
    pub fn position(&self, primary_key: &str, id: &str) -> Option<usize> {
        self.writable
            .iter()
            .position(|item| item.get(primary_key).is_some_and(|value| id_matches(value, id)))
    }

    /// Item whose `primary_key` matches `id`.
    pub fn find(&self, primary_key: &str, id: &str) -> Option<&Record> {
        self.position(primary_key, id).map(|pos| &self.writable[pos])
    }

    pub fn len(&self) -> usize {
        self.writable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writable.is_empty()
    }
}

/// Build the list view of `items`.
///
/// With a property list, each entry keeps only the named properties that the
/// item actually has. Without one, entries are full copies.
pub fn project(items: &[Record], properties: Option<&[String]>) -> Vec<Record> {
    match properties {
        None => items.to_vec(),
        Some(properties) => items
            .iter()
            .map(|item| {
                properties
                    .iter()
                    .filter_map(|name| item.get(name).map(|value| (name.clone(), value.clone())))
                    .collect()
            })
            .collect(),
    }
}

/// String rendering of an id value, if it can act as an id.
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stringify-then-compare equality between a stored id and a URL id.
pub fn id_matches(value: &Value, id: &str) -> bool {
    match value {
        Value::String(s) => s == id,
        Value::Number(n) => n.to_string() == id,
        _ => false,
    }
}
