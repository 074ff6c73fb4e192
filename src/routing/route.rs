//! Route definitions and the callback capabilities attached to them.
//!
//! A [`RouteGroup`] is a flattened nesting chain: `posts/:postId` followed by
//! `comments/:commentId` describes comments nested under posts. Each level may
//! carry a [`DataProvider`] that seeds its collection and a [`ResponseShaper`]
//! that post-processes responses.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;

use crate::dispatch::request::QueryParams;
use crate::dispatch::response::{MockError, MockResponse};
use crate::store::collection::Record;

/// Boxed error returned by user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Arguments handed to a [`DataProvider`].
#[derive(Debug)]
pub struct DataContext<'a> {
    /// Current items of the collection; empty on first load.
    pub items: Vec<Record>,
    /// Id from the URL at this nesting level, if any.
    pub item_id: Option<&'a str>,
    pub method: &'a Method,
    /// Resolved ancestor items, outermost first.
    pub parents: &'a [Record],
    pub query: &'a QueryParams,
    pub body: Option<&'a Value>,
}

/// Produces the items of a collection.
pub trait DataProvider: Send + Sync {
    fn provide(&self, ctx: DataContext<'_>) -> Result<Vec<Record>, BoxError>;
}

/// Arguments handed to a [`ResponseShaper`]. Everything is a copy, so shapers
/// cannot reach the stored collection.
#[derive(Debug)]
pub struct ShapeContext<'a> {
    /// Body produced by the verb handler, always an array.
    pub body: Value,
    pub item_id: Option<&'a str>,
    pub method: &'a Method,
    pub parents: Vec<Record>,
    pub query: &'a QueryParams,
    pub request_body: Option<Value>,
}

/// What a [`ResponseShaper`] hands back.
#[derive(Debug, Clone)]
pub enum Shaped {
    /// Replace the response body, keep status and headers.
    Body(Value),
    /// Send this response as-is.
    Response(MockResponse),
    /// Fail the request with this error.
    Error(MockError),
}

/// Post-processes the response of a route.
pub trait ResponseShaper: Send + Sync {
    fn shape(&self, ctx: ShapeContext<'_>) -> Result<Shaped, BoxError>;
}

struct FnProvider<F>(F);

impl<F> DataProvider for FnProvider<F>
where
    F: for<'a> Fn(DataContext<'a>) -> Result<Vec<Record>, BoxError> + Send + Sync,
{
    fn provide(&self, ctx: DataContext<'_>) -> Result<Vec<Record>, BoxError> {
        (self.0)(ctx)
    }
}

struct FnShaper<F>(F);

impl<F> ResponseShaper for FnShaper<F>
where
    F: for<'a> Fn(ShapeContext<'a>) -> Result<Shaped, BoxError> + Send + Sync,
{
    fn shape(&self, ctx: ShapeContext<'_>) -> Result<Shaped, BoxError> {
        (self.0)(ctx)
    }
}

/// Serves a fixed list of items on first load.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    items: Vec<Record>,
}

impl SeedData {
    pub fn new(items: Vec<Record>) -> Self {
        Self { items }
    }

    /// Build from JSON values, keeping only objects.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let items = values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Self { items }
    }
}

impl DataProvider for SeedData {
    fn provide(&self, ctx: DataContext<'_>) -> Result<Vec<Record>, BoxError> {
        if ctx.items.is_empty() {
            Ok(self.items.clone())
        } else {
            Ok(ctx.items)
        }
    }
}

/// One nesting level of a route group.
#[derive(Clone)]
pub struct Route {
    path: String,
    data: Option<Arc<dyn DataProvider>>,
    response: Option<Arc<dyn ResponseShaper>>,
    properties_for_list: Option<Vec<String>>,
    refresh: bool,
}

impl Route {
    /// Create a route for `path`, e.g. `api/posts/:postId`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: None,
            response: None,
            properties_for_list: None,
            refresh: false,
        }
    }

    #[must_use]
    pub fn data(mut self, provider: impl DataProvider + 'static) -> Self {
        self.data = Some(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn data_arc(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.data = Some(provider);
        self
    }

    /// Use a closure as data provider.
    #[must_use]
    pub fn data_fn<F>(self, f: F) -> Self
    where
        F: for<'a> Fn(DataContext<'a>) -> Result<Vec<Record>, BoxError> + Send + Sync + 'static,
    {
        self.data(FnProvider(f))
    }

    /// Serve `items` as the initial collection.
    #[must_use]
    pub fn seed(self, items: impl IntoIterator<Item = Value>) -> Self {
        self.data(SeedData::from_values(items))
    }

    #[must_use]
    pub fn respond(mut self, shaper: impl ResponseShaper + 'static) -> Self {
        self.response = Some(Arc::new(shaper));
        self
    }

    #[must_use]
    pub fn respond_arc(mut self, shaper: Arc<dyn ResponseShaper>) -> Self {
        self.response = Some(shaper);
        self
    }

    /// Use a closure as response shaper.
    #[must_use]
    pub fn respond_fn<F>(self, f: F) -> Self
    where
        F: for<'a> Fn(ShapeContext<'a>) -> Result<Shaped, BoxError> + Send + Sync + 'static,
    {
        self.respond(FnShaper(f))
    }

    /// Limit collection listings to these properties.
    #[must_use]
    pub fn properties_for_list<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties_for_list = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    /// Re-run the data provider on every access.
    #[must_use]
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the trailing `:param`, if the path ends with one.
    pub fn primary_key(&self) -> Option<&str> {
        self.path.rsplit('/').next().and_then(|last| last.strip_prefix(':'))
    }

    /// Static prefix before the first parameter.
    pub fn static_prefix(&self) -> &str {
        self.path.split("/:").next().unwrap_or_default()
    }

    pub fn data_provider(&self) -> Option<&Arc<dyn DataProvider>> {
        self.data.as_ref()
    }

    pub fn response_shaper(&self) -> Option<&Arc<dyn ResponseShaper>> {
        self.response.as_ref()
    }

    pub fn list_properties(&self) -> Option<&[String]> {
        self.properties_for_list.as_deref()
    }

    pub fn is_refresh(&self) -> bool {
        self.refresh
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("data", &self.data.is_some())
            .field("response", &self.response.is_some())
            .field("properties_for_list", &self.properties_for_list)
            .field("refresh", &self.refresh)
            .finish()
    }
}

/// Parent-to-child chain of routes, optionally bound to a host.
#[derive(Debug, Clone, Default)]
pub struct RouteGroup {
    host: Option<String>,
    routes: Vec<Route>,
}

impl RouteGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the group to an absolute origin such as `https://api.example.com`.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Append the next nesting level.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn host_str(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Host plus static prefix of the first route, used for coarse dispatch.
    pub fn root_path(&self) -> String {
        let prefix = self.routes.first().map(Route::static_prefix).unwrap_or_default();
        match &self.host {
            Some(host) => format!("{}/{}", host, prefix),
            None => prefix.to_string(),
        }
    }

    /// Dotted path of the group for error messages, e.g. `posts/:postId.comments/:commentId`.
    pub fn chain_path(&self) -> String {
        self.routes
            .iter()
            .map(Route::path)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl FromIterator<Route> for RouteGroup {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        Self {
            host: None,
            routes: iter.into_iter().collect(),
        }
    }
}
