//! # Cache Module
//!
//! Durable local storage for the frame.
//!
//! ## Overview
//!
//! - [`CacheStore`] holds downloaded photos (payload plus metadata) and
//!   enforces the capacity limit, evicting the oldest insertions first.
//! - [`StateStore`] holds the scalar [`PersistedState`]: the last applied
//!   manifest and its signature, sync/check timestamps, the last error,
//!   the force-recheck flag and the manifest URL override.
//!
//! Both sit on a [`KeyValueStore`](bridge_traits::storage::KeyValueStore),
//! SQLite on the desktop and an in-memory map in tests.

pub mod error;
pub mod state;
pub mod store;

pub use error::{CacheError, Result};
pub use state::{PersistedState, StateStore};
pub use store::{CacheStats, CachedPhoto, CacheStore, PhotoMeta};
