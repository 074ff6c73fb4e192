//! Named callbacks for declarative route groups.
//!
//! Route groups read from a config file reference data providers and
//! response shapers by name. The registry resolves those names into the
//! capability objects a [`Route`] carries.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::{RouteConfig, RouteGroupConfig};
use crate::routing::route::{DataProvider, ResponseShaper, Route, RouteGroup, SeedData};
use crate::routing::validator::ValidationError;

/// Name -> callback tables.
#[derive(Default, Clone)]
pub struct CallbackRegistry {
    providers: HashMap<String, Arc<dyn DataProvider>>,
    shapers: HashMap<String, Arc<dyn ResponseShaper>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn provider(mut self, name: impl Into<String>, provider: impl DataProvider + 'static) -> Self {
        self.providers.insert(name.into(), Arc::new(provider));
        self
    }

    #[must_use]
    pub fn shaper(mut self, name: impl Into<String>, shaper: impl ResponseShaper + 'static) -> Self {
        self.shapers.insert(name.into(), Arc::new(shaper));
        self
    }

    /// Build route groups from their declarative form.
    ///
    /// Only names are checked here; the structural rules are applied by the
    /// route validator afterwards.
    pub fn build_groups(&self, configs: &[RouteGroupConfig]) -> Result<Vec<RouteGroup>, ValidationError> {
        configs.iter().map(|config| self.build_group(config)).collect()
    }

    fn build_group(&self, config: &RouteGroupConfig) -> Result<RouteGroup, ValidationError> {
        let mut group = RouteGroup::new();
        if let Some(host) = &config.host {
            group = group.host(host.clone());
        }
        for route in &config.routes {
            group = group.route(self.build_route(route)?);
        }
        Ok(group)
    }

    fn build_route(&self, config: &RouteConfig) -> Result<Route, ValidationError> {
        let mut route = Route::new(config.path.clone()).refresh(config.refresh);

        match (&config.data, &config.seed) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::ConflictingData {
                    path: config.path.clone(),
                })
            }
            (Some(name), None) => {
                let provider = self.providers.get(name).ok_or_else(|| ValidationError::UnknownCallback {
                    kind: "data",
                    name: name.clone(),
                    path: config.path.clone(),
                })?;
                route = route.data_arc(provider.clone());
            }
            (None, Some(seed)) => {
                route = route.data(SeedData::from_values(seed.iter().cloned()));
            }
            (None, None) => {}
        }

        if let Some(name) = &config.response {
            let shaper = self.shapers.get(name).ok_or_else(|| ValidationError::UnknownCallback {
                kind: "response",
                name: name.clone(),
                path: config.path.clone(),
            })?;
            route = route.respond_arc(shaper.clone());
        }

        if let Some(properties) = &config.properties_for_list {
            route = route.properties_for_list(properties.iter().cloned());
        }

        Ok(route)
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("shapers", &self.shapers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::{BoxError, DataContext, ShapeContext, Shaped};
    use crate::store::collection::Record;
    use serde_json::json;

    struct Empty;

    impl DataProvider for Empty {
        fn provide(&self, _ctx: DataContext<'_>) -> Result<Vec<Record>, BoxError> {
            Ok(Vec::new())
        }
    }

    struct Identity;

    impl ResponseShaper for Identity {
        fn shape(&self, ctx: ShapeContext<'_>) -> Result<Shaped, BoxError> {
            Ok(Shaped::Body(ctx.body))
        }
    }

    fn route(path: &str) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolves_names_and_seed() {
        let registry = CallbackRegistry::new().provider("empty", Empty).shaper("identity", Identity);
        let config = RouteGroupConfig {
            host: Some("https://api.example.com".into()),
            routes: vec![
                RouteConfig {
                    seed: Some(vec![json!({"postId": 1})]),
                    properties_for_list: Some(vec!["postId".into()]),
                    ..route("posts/:postId")
                },
                RouteConfig {
                    data: Some("empty".into()),
                    response: Some("identity".into()),
                    refresh: true,
                    ..route("comments/:commentId")
                },
            ],
        };

        let groups = registry.build_groups(&[config]).unwrap();
        let routes = groups[0].routes();
        assert_eq!(groups[0].host_str(), Some("https://api.example.com"));
        assert!(routes[0].data_provider().is_some());
        assert_eq!(routes[0].list_properties().unwrap(), ["postId".to_string()]);
        assert!(routes[1].response_shaper().is_some());
        assert!(routes[1].is_refresh());
    }

    #[test]
    fn test_unknown_callbacks() {
        let registry = CallbackRegistry::new();
        let config = RouteGroupConfig {
            host: None,
            routes: vec![RouteConfig {
                data: Some("missing".into()),
                ..route("posts/:postId")
            }],
        };
        let err = registry.build_groups(&[config]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "data callback `missing` for route `posts/:postId` is not registered"
        );

        let config = RouteGroupConfig {
            host: None,
            routes: vec![RouteConfig {
                response: Some("nope".into()),
                ..route("health")
            }],
        };
        let err = registry.build_groups(&[config]).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownCallback { kind: "response", .. }));
    }

    #[test]
    fn test_data_and_seed_conflict() {
        let registry = CallbackRegistry::new().provider("empty", Empty);
        let config = RouteGroupConfig {
            host: None,
            routes: vec![RouteConfig {
                data: Some("empty".into()),
                seed: Some(vec![]),
                ..route("posts/:postId")
            }],
        };
        let err = registry.build_groups(&[config]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ConflictingData {
                path: "posts/:postId".into()
            }
        );
    }
}
