//! The cache-consistency and optimistic-update engine.
//!
//! Components, leaf-first:
//!
//! - `store`: keyed, versioned in-memory entity store with
//!   subscribe/notify semantics
//! - `key`: the cache key space
//! - `fetch`: request coalescing and staleness policy
//! - `invalidation`: the static kind-to-keys dependency map
//! - `mutation`: optimistic create/update/delete with commit-or-clear
//!   reconciliation
//! - `session`: the owned facade constructed per user session
//!
//! All state lives in the `EntityStore`; everything else orchestrates
//! reads and writes through its `set`/`patch`/`invalidate` operations.

pub mod fetch;
pub mod invalidation;
pub mod key;
pub mod mutation;
pub mod session;
pub mod store;

pub use fetch::FetchCoordinator;
pub use key::CacheKey;
pub use mutation::{MutationOp, MutationPipeline, PendingWrite};
pub use session::CacheSession;
pub use store::{CachedEntry, CachedValue, EntityStore, StoreEvent, Subscription};
