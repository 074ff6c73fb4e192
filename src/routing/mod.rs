//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (startup or ApiMock::register):
//!     RouteGroup[] (code) or RouteGroupConfig[] → registry.rs
//!     → validator.rs (structure, hosts, duplicate roots)
//!     → index.rs (root paths, longest first)
//!
//! Per request (normalized URL):
//!     → index.rs (longest matching root → group)
//!     → matcher.rs (segment counts → DryMatch)
//!     → chain.rs (static segments verified → ChainParam per level)
//! ```
//!
//! # Design Decisions
//! - Route tables are immutable once built; registration swaps a new one in
//! - Matching is case-sensitive and segment-exact
//! - Callbacks are trait objects, so "must be callable" is a type-level fact

pub mod chain;
pub mod index;
pub mod matcher;
pub mod registry;
pub mod route;
pub mod validator;

pub use chain::ChainParam;
pub use registry::CallbackRegistry;
pub use route::{
    BoxError, DataContext, DataProvider, ResponseShaper, Route, RouteGroup, SeedData, ShapeContext, Shaped,
};
pub use validator::{RouteValidator, ValidationError};
