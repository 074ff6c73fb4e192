//! Structural (dry) matching of a URL against a route chain.
//!
//! # Responsibilities
//! - Walk a group level by level, growing the route template
//! - Decide from segment counts whether the URL can address that level
//! - Note whether the URL ends with an id or at the collection
//!
//! # Design Decisions
//! - Only counts and placeholder positions are checked here; static segment
//!   content is verified by the chain resolver
//! - The first satisfiable level wins, deeper levels are never considered

use crate::routing::route::{Route, RouteGroup};

/// Outcome of a successful dry match.
#[derive(Debug, Clone)]
pub struct DryMatch<'a> {
    /// URL split on `/`.
    pub split_url: Vec<&'a str>,
    /// Accumulated route template split on `/`.
    pub split_route: Vec<String>,
    /// The consumed prefix of the group.
    pub routes: &'a [Route],
    /// The URL carries an id for the deepest consumed level.
    pub has_trailing_id: bool,
    /// Primary key name of the deepest consumed level.
    pub last_primary_key: Option<String>,
}

/// Match `url` (normalized) against `group`.
pub fn dry_match<'a>(url: &'a str, group: &'a RouteGroup) -> Option<DryMatch<'a>> {
    let split_url: Vec<&str> = url.split('/').collect();
    let n = split_url.len();
    let routes = group.routes();

    let mut template = group.host_str().map(str::to_string).unwrap_or_default();

    for (i, route) in routes.iter().enumerate() {
        if !template.is_empty() {
            template.push('/');
        }
        template.push_str(route.path());

        let split_route: Vec<String> = template.split('/').map(str::to_string).collect();
        let m = split_route.len();

        // URL goes deeper than this level
        if n > m {
            continue;
        }
        if n + 1 < m {
            return None;
        }

        let last = &split_route[m - 1];
        let placeholder = last.strip_prefix(':').map(str::to_string);

        let has_trailing_id = if n + 1 == m {
            // Collection request: the omitted segment must be the id
            placeholder.as_ref()?;
            false
        } else {
            placeholder.is_some()
        };

        return Some(DryMatch {
            split_url,
            split_route,
            routes: &routes[..=i],
            has_trailing_id,
            last_primary_key: placeholder,
        });
    }

    None
}
