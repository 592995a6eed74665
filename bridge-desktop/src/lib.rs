//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and kiosk hosts
//! (Linux, macOS, Windows).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` (rustls, 30 s default timeout)
//! - `KeyValueStore` using a SQLite database via `sqlx`
//! - `TimerScheduler` using `tokio::time`
//! - `DisplaySurface` decoding into memory with the `image` crate
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteKeyValueStore, TokioScheduler};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http = ReqwestHttpClient::new()?;
//!     let store = SqliteKeyValueStore::new("/var/lib/frame/frame.db".into()).await?;
//!     let timers = TokioScheduler::new();
//!
//!     // Hand these to the frame service
//!     Ok(())
//! }
//! ```

mod http;
mod kv_store;
mod scheduler;
mod surface;

pub use http::{ReqwestHttpClient, DEFAULT_TIMEOUT};
pub use kv_store::SqliteKeyValueStore;
pub use scheduler::TokioScheduler;
pub use surface::{ImageSurface, LayerState};
