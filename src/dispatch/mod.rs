//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! InterceptedRequest (request.rs)
//!     → dispatcher.rs: root index lookup → dry match → chain resolution
//!     → parents resolved through the resource store
//!     → verbs.rs (GET/POST/PUT/PATCH/DELETE against the target collection)
//!     → store commit (read view rebuilt, optional persistence)
//!     → response shaper (optional)
//!     → MockResponse | MockError (response.rs)
//!     → artificial delay (success only) → caller
//!
//! No match:
//!     → 404, or Outcome::Passthrough when pass_through_unknown_url is set
//! ```
//!
//! # Design Decisions
//! - Matching and mutation are synchronous; only the delay awaits
//! - Verb handlers are pure functions of (request, collection)
//! - Every failure is a `MockError`; panics are caught at `dispatch`

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod verbs;

pub use dispatcher::{ApiMock, Outcome};
pub use request::{InterceptedRequest, QueryParams};
pub use response::{ErrorResponse, MockError, MockResponse};
