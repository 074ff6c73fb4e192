//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MockConfig (validated, immutable)
//!     → [[groups]] resolved by routing::registry, checked by routing::validator
//!     → ApiMockConfig owned by the ApiMock, ServerConfig by the HttpServer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; route groups may still be added at
//!   runtime through `ApiMock::register`
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ApiMockConfig, MockConfig, ObservabilityConfig, RouteConfig, RouteGroupConfig, ServerConfig};
