//! Chain resolution: turns a dry match into per-level parameters.

use crate::routing::matcher::DryMatch;
use crate::routing::route::Route;

/// Resolved data for one nesting level of a request.
#[derive(Debug, Clone)]
pub struct ChainParam<'a> {
    /// Identifies the collection instance, e.g. `posts/123/comments`.
    pub cache_key: String,
    pub route: &'a Route,
    pub primary_key: Option<String>,
    /// Id taken from the URL; `None` for collection-level access.
    pub resource_id: Option<String>,
}

/// Resolve `dry` into one [`ChainParam`] per consumed level.
///
/// Returns `None` when the static segments of URL and template differ.
pub fn resolve_chain<'a>(dry: &DryMatch<'a>) -> Option<Vec<ChainParam<'a>>> {
    let mut params = Vec::with_capacity(dry.routes.len());
    let mut static_url: Vec<&str> = Vec::new();
    let mut static_route: Vec<&str> = Vec::new();
    let mut next_route = 0;

    for (i, &url_segment) in dry.split_url.iter().enumerate() {
        let route_segment = dry.split_route.get(i)?;
        match route_segment.strip_prefix(':') {
            Some(key) => {
                let route = dry.routes.get(next_route)?;
                next_route += 1;
                params.push(ChainParam {
                    cache_key: dry.split_url[..i].join("/"),
                    route,
                    primary_key: Some(key.to_string()),
                    resource_id: Some(url_segment.to_string()),
                });
            }
            None => {
                static_url.push(url_segment);
                static_route.push(route_segment.as_str());
            }
        }
    }

    if !dry.has_trailing_id {
        params.push(ChainParam {
            cache_key: dry.split_url.join("/"),
            route: dry.routes.get(next_route)?,
            primary_key: dry.last_primary_key.clone(),
            resource_id: None,
        });
    }

    if static_url != static_route {
        return None;
    }

    Some(params)
}
