//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mock.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration for the API mock.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MockConfig {
    /// Standalone server settings.
    pub server: ServerConfig,

    /// Interception behavior.
    pub mock: ApiMockConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Declarative route groups.
    pub groups: Vec<RouteGroupConfig>,
}

/// Standalone server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum buffered request body.
    pub max_body_bytes: usize,

    /// Base URL unknown requests are forwarded to.
    pub upstream: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024,
            upstream: None,
        }
    }
}

/// Interception and REST policy options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiMockConfig {
    /// Artificial latency applied to successful responses.
    pub delay_ms: u64,

    /// Log request/response summaries at info instead of debug.
    pub show_log: bool,

    /// Accepted for compatibility; has no effect.
    pub clear_log_on_navigation: bool,

    /// Persist collections to external storage.
    pub cache_to_external_storage: bool,

    /// Storage slot holding the persisted collections.
    pub external_storage_key: String,

    /// Accepted but never consulted; matching is always case-sensitive.
    pub case_sensitive_search: bool,

    /// Forward unmatched requests to the real transport instead of 404.
    pub pass_through_unknown_url: bool,

    /// POST onto an existing id answers 204 instead of 200.
    pub post_return_204: bool,

    /// POST onto an existing id answers 409.
    pub post_update_409: bool,

    /// PUT on an existing item answers 204 instead of 200.
    pub put_return_204: bool,

    /// PUT on a missing item answers 404 instead of creating it.
    pub put_not_found_404: bool,

    /// DELETE of a missing item answers 404.
    pub delete_not_found_404: bool,

    /// Directory used by the file storage backend.
    pub storage_dir: String,
}

impl Default for ApiMockConfig {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            show_log: true,
            clear_log_on_navigation: false,
            cache_to_external_storage: false,
            external_storage_key: "apiMockCachedData".to_string(),
            case_sensitive_search: false,
            pass_through_unknown_url: false,
            post_return_204: true,
            post_update_409: false,
            put_return_204: true,
            put_not_found_404: false,
            delete_not_found_404: true,
            storage_dir: ".".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A route group as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteGroupConfig {
    /// Absolute origin, e.g. "https://api.example.com".
    #[serde(default)]
    pub host: Option<String>,

    /// Nesting chain, parent first.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// One nesting level of a declarative route group.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteConfig {
    /// Path template, e.g. "api/posts/:postId".
    pub path: String,

    /// Name of a registered data provider.
    #[serde(default)]
    pub data: Option<String>,

    /// Inline initial items.
    #[serde(default)]
    pub seed: Option<Vec<Value>>,

    /// Name of a registered response shaper.
    #[serde(default)]
    pub response: Option<String>,

    #[serde(default)]
    pub properties_for_list: Option<Vec<String>>,

    /// Re-run the data provider on every access.
    #[serde(default)]
    pub refresh: bool,
}
