//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, trace)
//!     → layer.rs (buffer body → InterceptedRequest → ApiMock::intercept)
//!         Mocked      → JSON response
//!         Error       → text/plain with error status
//!         Passthrough → upstream.rs (hyper-util client) → real backend
//!     → Send to client
//! ```
//!
//! `MockLayer` also works standalone around any tower service acting as
//! the real transport.

pub mod layer;
pub mod server;
pub mod upstream;

pub use layer::{MockLayer, MockService};
pub use server::HttpServer;
pub use upstream::Upstream;
