//! Resource store subsystem.
//!
//! # Data Flow
//! ```text
//! ChainParam (cache key + route)
//!     → cache.rs: hit → shared collection
//!                 miss → persistence.rs (rehydrate) or data provider
//!     → collection.rs: writable items + projected read view
//!
//! On mutation:
//!     verb result → cache.rs commit → read view rebuilt → persistence.rs save
//! ```
//!
//! # Design Decisions
//! - One mutex per collection guards every read-modify-write
//! - Lazily populated, never evicted; lives as long as the `ApiMock`
//! - Persistence is best-effort and never fails a request

pub mod cache;
pub mod collection;
pub mod persistence;

pub use cache::{CollectionHandle, LoadContext, ResourceStore};
pub use collection::{CachedCollection, Record};
pub use persistence::{FileBackend, MemoryBackend, StorageBackend};
