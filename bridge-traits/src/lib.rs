//! # Host Bridge Traits
//!
//! Everything the frame core needs from the device it runs on, expressed as
//! `Send + Sync` traits. The core never touches the network, disk, clock or
//! screen directly; a host (desktop kiosk, embedded panel, test harness)
//! hands it implementations of these.
//!
//! | Capability | Trait | Test double |
//! |------------|-------|-------------|
//! | Network    | [`HttpClient`] | `mockall` in each crate's tests |
//! | Storage    | [`KeyValueStore`] / [`KvTransaction`] | [`MemoryKeyValueStore`] |
//! | Time       | [`Clock`] | [`ManualClock`] |
//! | Timers     | [`TimerScheduler`] | [`ManualScheduler`] |
//! | Display    | [`DisplaySurface`] | `mockall` |
//! | Logs       | [`LoggerSink`] | none |
//!
//! Implementations convert platform failures into [`BridgeError`] with enough
//! context (key, URL, layer) to act on.
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bridge_traits::{error::Result, HttpClient, HttpRequest, HttpResponse};
//!
//! struct PanelHttp { /* vendor SDK handle */ }
//!
//! #[async_trait]
//! impl HttpClient for PanelHttp {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // translate into the vendor SDK call
//!         todo!()
//!     }
//! }
//! ```

pub mod display;
pub mod error;
pub mod http;
pub mod log;
pub mod scheduler;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use display::{DisplaySurface, LayerId, SurfaceHandle};
pub use http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
pub use log::{LogEntry, LogLevel, LoggerSink};
pub use scheduler::{Interval, ManualScheduler, TimerScheduler};
pub use storage::{KeyValueStore, KvTransaction, MemoryKeyValueStore};
pub use time::{Clock, ManualClock, SystemClock};
