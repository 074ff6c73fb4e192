//! Route group validation.
//!
//! # Responsibilities
//! - Structural checks on every route of every group (primary keys, callbacks, slashes)
//! - Host format check
//! - Duplicate root detection, remembered across calls
//!
//! # Design Decisions
//! - Fails fast on the first problem; route specs are authored by hand and
//!   one clear message beats a list
//! - Accepted roots are remembered with the shape of their group, so
//!   re-validating an identical group is a no-op while a different group
//!   claiming the same root is rejected

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::routing::route::RouteGroup;

/// Malformed route group.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("route group is empty")]
    EmptyGroup,

    #[error("route path is empty in `{group}`")]
    EmptyPath { group: String },

    #[error("wrong multi-level route `{group}`: every level except the last needs a data callback and a path like `resource/:id`")]
    WrongMultiLevelRoute { group: String },

    #[error("route `{path}` must pair a data callback with a primary key, and vice versa")]
    CallbackPrimaryKeyMismatch { path: String },

    #[error("route `{path}` may only have one `:param`, as its last segment")]
    MisplacedPrimaryKey { path: String },

    #[error("route `{path}` must not end with a slash")]
    TrailingSlash { path: String },

    #[error("wrong host `{host}`: expected an origin like `https://example.com` without trailing slash")]
    InvalidHost { host: String },

    #[error("duplicate root path `{root}`")]
    DuplicateRoot { root: String },

    #[error("{kind} callback `{name}` for route `{path}` is not registered")]
    UnknownCallback {
        kind: &'static str,
        name: String,
        path: String,
    },

    #[error("route `{path}` declares both a named data callback and seed data")]
    ConflictingData { path: String },
}

fn primary_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:[\w-]+/)+:\w+$").expect("static regex"))
}

fn host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://(?:[^/]+\.)+[^/]+$").expect("static regex"))
}

/// Key used for duplicate detection: `<host>/<static prefix>`.
pub fn root_key(group: &RouteGroup) -> String {
    let prefix = group.routes().first().map(|r| r.static_prefix()).unwrap_or_default();
    format!("{}/{}", group.host_str().unwrap_or_default(), prefix)
}

fn signature(group: &RouteGroup) -> String {
    format!("{}|{}", group.host_str().unwrap_or_default(), group.chain_path())
}

/// Validates route groups and remembers the roots it accepted.
#[derive(Debug, Default)]
pub struct RouteValidator {
    /// root key -> signature of the group that owns it
    registered: HashMap<String, String>,
}

impl RouteValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `groups` and record their roots. Returns the groups unchanged.
    pub fn validate(&mut self, groups: Vec<RouteGroup>) -> Result<Vec<RouteGroup>, ValidationError> {
        for group in &groups {
            check_group(group)?;
        }

        let mut accepted: HashMap<String, String> = HashMap::new();
        for group in &groups {
            let root = root_key(group);
            let sig = signature(group);

            if accepted.contains_key(&root) {
                return Err(ValidationError::DuplicateRoot { root });
            }
            if let Some(existing) = self.registered.get(&root) {
                if *existing != sig {
                    return Err(ValidationError::DuplicateRoot { root });
                }
            }
            accepted.insert(root, sig);
        }

        self.registered.extend(accepted);
        Ok(groups)
    }

    /// Whether `root` (as returned by [`root_key`]) has been accepted.
    pub fn is_registered(&self, root: &str) -> bool {
        self.registered.contains_key(root)
    }
}

/// Per-group structural checks.
pub fn check_group(group: &RouteGroup) -> Result<(), ValidationError> {
    let routes = group.routes();
    if routes.is_empty() {
        return Err(ValidationError::EmptyGroup);
    }

    for (i, route) in routes.iter().enumerate() {
        let path = route.path();
        if path.is_empty() {
            return Err(ValidationError::EmptyPath {
                group: group.chain_path(),
            });
        }

        let is_last = i + 1 == routes.len();
        let has_primary_key = primary_key_pattern().is_match(path);
        let has_data = route.data_provider().is_some();

        if !is_last && !(has_data && has_primary_key) {
            return Err(ValidationError::WrongMultiLevelRoute {
                group: group.chain_path(),
            });
        }
        if path.contains(':') && !has_primary_key {
            return Err(ValidationError::MisplacedPrimaryKey { path: path.to_string() });
        }
        if has_data != has_primary_key {
            return Err(ValidationError::CallbackPrimaryKeyMismatch { path: path.to_string() });
        }
        if path.ends_with('/') {
            return Err(ValidationError::TrailingSlash { path: path.to_string() });
        }
    }

    if let Some(host) = group.host_str() {
        if !host_pattern().is_match(host) {
            return Err(ValidationError::InvalidHost { host: host.to_string() });
        }
    }

    Ok(())
}
