//! REST verb semantics over a single collection.
//!
//! Handlers never mutate the collection they are given. A mutation is
//! returned as the complete new list of writable items and committed by the
//! caller, which keeps persistence and read-view rebuilding in one place.

use axum::http::{Method, StatusCode};
use serde_json::Value;

use crate::config::schema::ApiMockConfig;
use crate::dispatch::response::MockError;
use crate::store::collection::{id_matches, id_to_string, CachedCollection, Record};

/// Inputs of one verb execution.
#[derive(Debug)]
pub struct VerbContext<'a> {
    pub method: &'a Method,
    /// Request URL without trailing slash, used for `Location` headers.
    pub url: &'a str,
    pub primary_key: &'a str,
    pub resource_id: Option<&'a str>,
    pub body: Option<&'a Value>,
    pub policy: &'a ApiMockConfig,
}

/// Result of a verb execution.
#[derive(Debug, Clone, PartialEq)]
pub struct VerbOutcome {
    pub status: StatusCode,
    /// Response items; empty for 204.
    pub items: Vec<Record>,
    pub location: Option<String>,
    /// New writable items when the verb mutated the collection.
    pub writable: Option<Vec<Record>>,
}

impl VerbOutcome {
    fn read(items: Vec<Record>) -> Self {
        Self {
            status: StatusCode::OK,
            items,
            location: None,
            writable: None,
        }
    }

    fn write(status: StatusCode, item: Option<Record>, writable: Vec<Record>) -> Self {
        let items = match status {
            StatusCode::NO_CONTENT => Vec::new(),
            _ => item.into_iter().collect(),
        };
        Self {
            status,
            items,
            location: None,
            writable: Some(writable),
        }
    }

    fn with_location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }
}

/// Run the verb of `ctx` against `collection`.
pub fn execute(ctx: &VerbContext<'_>, collection: &CachedCollection) -> Result<VerbOutcome, MockError> {
    match *ctx.method {
        Method::GET => get(ctx, collection),
        Method::POST => post(ctx, collection),
        Method::PUT => put(ctx, collection),
        Method::PATCH => patch(ctx, collection),
        Method::DELETE => delete(ctx, collection),
        _ => Err(MockError::MethodNotAllowed(format!(
            "method {} is not supported by the API mock",
            ctx.method
        ))),
    }
}

/// Shallow merge of `changes` into `target`.
///
/// The stored primary key is never rewritten. A property that already exists
/// keeps its JSON kind; `null` may replace, or be replaced by, any kind. On
/// error `target` is left untouched.
pub fn merge_record(target: &mut Record, changes: &Record, primary_key: &str) -> Result<(), MockError> {
    for (key, value) in changes {
        if key == primary_key {
            continue;
        }
        if let Some(current) = target.get(key) {
            if !current.is_null() && !value.is_null() && kind(current) != kind(value) {
                return Err(MockError::BadRequest(format!(
                    "property `{}` is a {} and cannot be changed to a {}",
                    key,
                    kind(current),
                    kind(value)
                )));
            }
        }
    }

    for (key, value) in changes {
        if key != primary_key {
            target.insert(key.clone(), value.clone());
        }
    }
    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Next auto-generated id: one more than the largest integer id, or 1.
///
/// Fails with `Conflict` once the largest id is `i64::MAX`, since every
/// candidate would collide with or precede an existing id.
pub fn next_id(items: &[Record], primary_key: &str) -> Result<i64, MockError> {
    let max = items
        .iter()
        .filter_map(|item| match item.get(primary_key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        })
        .max();

    match max {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            MockError::Conflict(format!(
                "cannot generate `{}`: largest existing id {} has no successor",
                primary_key, max
            ))
        }),
    }
}

fn not_found(primary_key: &str, id: &str) -> MockError {
    MockError::NotFound(format!("item {}={} not found", primary_key, id))
}

fn body_object(ctx: &VerbContext<'_>) -> Result<Record, MockError> {
    match ctx.body {
        Some(Value::Object(map)) => Ok(map.clone()),
        _ => Err(MockError::BadRequest(format!(
            "{} {} requires a JSON object body",
            ctx.method, ctx.url
        ))),
    }
}

fn collection_url(url: &str) -> &str {
    url.rsplit_once('/').map_or(url, |(parent, _)| parent)
}

fn get(ctx: &VerbContext<'_>, collection: &CachedCollection) -> Result<VerbOutcome, MockError> {
    match ctx.resource_id {
        Some(id) => {
            let item = collection
                .find(ctx.primary_key, id)
                .ok_or_else(|| not_found(ctx.primary_key, id))?;
            Ok(VerbOutcome::read(vec![item.clone()]))
        }
        None => Ok(VerbOutcome::read(collection.readonly().to_vec())),
    }
}

fn post(ctx: &VerbContext<'_>, collection: &CachedCollection) -> Result<VerbOutcome, MockError> {
    if ctx.resource_id.is_some() {
        return Err(MockError::MethodNotAllowed(format!(
            "POST is not allowed on an item URL, use `{}` instead",
            collection_url(ctx.url)
        )));
    }

    let mut item = body_object(ctx)?;
    let pk = ctx.primary_key;
    if item.get(pk).map_or(true, Value::is_null) {
        item.insert(pk.to_string(), Value::from(next_id(collection.writable(), pk)?));
    }
    let id = item.get(pk).and_then(id_to_string).ok_or_else(|| {
        MockError::BadRequest(format!("primary key `{}` must be a string or a number", pk))
    })?;

    let mut writable = collection.writable().to_vec();
    match collection.position(pk, &id) {
        None => {
            writable.push(item.clone());
            let location = format!("{}/{}", ctx.url, id);
            Ok(VerbOutcome::write(StatusCode::CREATED, Some(item), writable).with_location(location))
        }
        Some(_) if ctx.policy.post_update_409 => Err(MockError::Conflict(format!(
            "item {}={} already exists",
            pk, id
        ))),
        Some(pos) => {
            writable[pos] = item.clone();
            let status = if ctx.policy.post_return_204 {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::OK
            };
            Ok(VerbOutcome::write(status, Some(item), writable))
        }
    }
}

fn put(ctx: &VerbContext<'_>, collection: &CachedCollection) -> Result<VerbOutcome, MockError> {
    let id = ctx.resource_id.ok_or_else(|| {
        MockError::MethodNotAllowed(format!("PUT requires an item id, e.g. `{}/<id>`", ctx.url))
    })?;
    let pk = ctx.primary_key;
    let missing_key = || MockError::NotFound(format!("primary key `{}` not found in request body", pk));
    // No body at all lacks the primary key just like `{}` does
    if ctx.body.is_none() {
        return Err(missing_key());
    }
    let item = body_object(ctx)?;

    let body_id = item.get(pk).ok_or_else(missing_key)?;
    if !id_matches(body_id, id) {
        return Err(MockError::BadRequest(format!(
            "primary key {}={} in the body does not match id {} in the URL",
            pk, body_id, id
        )));
    }

    let mut writable = collection.writable().to_vec();
    match collection.position(pk, id) {
        Some(pos) => {
            writable[pos] = item.clone();
            let status = if ctx.policy.put_return_204 {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::OK
            };
            Ok(VerbOutcome::write(status, Some(item), writable))
        }
        None if ctx.policy.put_not_found_404 => Err(not_found(pk, id)),
        None => {
            writable.push(item.clone());
            Ok(VerbOutcome::write(StatusCode::CREATED, Some(item), writable).with_location(ctx.url.to_string()))
        }
    }
}

fn patch(ctx: &VerbContext<'_>, collection: &CachedCollection) -> Result<VerbOutcome, MockError> {
    let id = ctx.resource_id.ok_or_else(|| {
        MockError::MethodNotAllowed(format!("PATCH requires an item id, e.g. `{}/<id>`", ctx.url))
    })?;
    let pk = ctx.primary_key;
    let pos = collection.position(pk, id).ok_or_else(|| not_found(pk, id))?;
    let changes = body_object(ctx)?;

    if let Some(body_id) = changes.get(pk) {
        if !id_matches(body_id, id) {
            return Err(MockError::BadRequest(format!(
                "primary key {}={} in the body does not match id {} in the URL",
                pk, body_id, id
            )));
        }
    }

    let mut writable = collection.writable().to_vec();
    merge_record(&mut writable[pos], &changes, pk)?;
    Ok(VerbOutcome::write(StatusCode::NO_CONTENT, None, writable))
}

fn delete(ctx: &VerbContext<'_>, collection: &CachedCollection) -> Result<VerbOutcome, MockError> {
    let pk = ctx.primary_key;
    let id = ctx
        .resource_id
        .ok_or_else(|| MockError::NotFound(format!("DELETE requires an item id, e.g. `{}/<id>`", ctx.url)))?;

    let mut writable = collection.writable().to_vec();
    match collection.position(pk, id) {
        Some(pos) => {
            writable.remove(pos);
        }
        None if ctx.policy.delete_not_found_404 => return Err(not_found(pk, id)),
        None => {}
    }
    Ok(VerbOutcome::write(StatusCode::NO_CONTENT, None, writable))
}
