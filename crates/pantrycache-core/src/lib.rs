//! Core library for pantrycache, a personal recipe manager client.
//!
//! The interesting part is not the storage or the forms - it is keeping a
//! locally held, partially materialized view of a relational graph correct
//! and responsive while mutations race against the authoritative backend.
//! This crate provides:
//!
//! - `models`: recipes, ingredients, categories, and their associations
//! - `api`: the `RemoteStore` collaborator trait and its reqwest client
//! - `cache`: the entity store, fetch coordinator, invalidation graph,
//!   optimistic mutation pipeline, and the per-session facade
//! - `views`: pure derived projections (detail join, list pipeline)
//! - `config`: JSON configuration under the user config directory
//!
//! Frontends construct a [`CacheSession`] at sign-in, call `ensure_*` when
//! a view mounts, subscribe to keys they render, and route every write
//! through the mutation pipeline.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod utils;
pub mod views;

pub use api::{ApiClient, ApiError, RemoteStore};
pub use cache::{
    CacheKey, CacheSession, CachedEntry, CachedValue, EntityStore, FetchCoordinator,
    MutationOp, MutationPipeline, PendingWrite, StoreEvent, Subscription,
};
pub use config::Config;
