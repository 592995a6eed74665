//! Frame service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges (HTTP, key-value storage, clock,
//! timers, display surface) into the sync and playback cores and runs the
//! frame's two loops. Desktop and headless hosts typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop`); embedded
//! hosts inject their own bridges through [`FrameContext::builder`].
//!
//! ```ignore
//! let config = FrameConfig::builder().build()?;
//! let service = FrameService::bootstrap(FrameContext::builder(config)).await?;
//!
//! let shutdown = Shutdown::new();
//! service.run(shutdown.signal()).await;
//! ```

pub mod context;
pub mod error;
pub mod service;
pub mod shutdown;
pub mod state;
pub mod status;

pub use context::{FrameContext, FrameContextBuilder};
pub use error::{Result, ServiceError};
pub use service::{CycleOutcome, FrameService, SyncCycle};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use state::FrameState;
pub use status::{StatusReporter, StatusSnapshot};
