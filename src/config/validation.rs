//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MockConfig → Result<(), Vec<ConfigIssue>>
//! - Route groups are checked later by the route validator, once callbacks
//!   are resolved

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::MockConfig;
use crate::store::persistence::is_file_safe_key;

/// One semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &MockConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue {
            field: "server.bind_address",
            message: format!("`{}` is not a socket address", config.server.bind_address),
        });
    }

    if config.server.request_timeout_secs == 0 {
        issues.push(ConfigIssue {
            field: "server.request_timeout_secs",
            message: "must be greater than 0".to_string(),
        });
    }

    if let Some(upstream) = &config.server.upstream {
        match Url::parse(upstream) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => issues.push(ConfigIssue {
                field: "server.upstream",
                message: format!("`{}` is not an absolute http(s) URL", upstream),
            }),
        }
    }

    let storage_key = &config.mock.external_storage_key;
    if storage_key.trim().is_empty() {
        issues.push(ConfigIssue {
            field: "mock.external_storage_key",
            message: "must not be empty".to_string(),
        });
    } else if !is_file_safe_key(storage_key) {
        issues.push(ConfigIssue {
            field: "mock.external_storage_key",
            message: format!("`{}` must not contain path separators or `..`", storage_key),
        });
    }

    if config.observability.metrics_enabled && config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue {
            field: "observability.metrics_address",
            message: format!("`{}` is not a socket address", config.observability.metrics_address),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
