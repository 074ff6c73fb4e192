//! In-process REST backend emulation.
//!
//! Route groups describe nested resources (`posts/:postId` → `comments/:commentId`).
//! Requests matching them are answered from in-memory collections with REST
//! semantics; everything else is a 404 or is passed through to a real
//! transport.
//!
//! ```text
//!   request ──▶ http::layer ──▶ dispatch::ApiMock ──▶ routing (index → matcher → chain)
//!                  │                    │
//!                  │                    ├──▶ store (collections, persistence)
//!                  │                    └──▶ dispatch::verbs ──▶ response shaper
//!                  ▼
//!            http::upstream (passthrough)
//! ```

// Core subsystems
pub mod dispatch;
pub mod routing;
pub mod store;

// Surfaces
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use config::schema::{ApiMockConfig, MockConfig};
pub use dispatch::{ApiMock, InterceptedRequest, MockError, MockResponse, Outcome};
pub use http::{HttpServer, MockLayer};
pub use routing::{CallbackRegistry, Route, RouteGroup};
