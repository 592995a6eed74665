//! Workspace façade crate.
//!
//! Exposes feature flags that map to the individual workspace crates so a
//! host application can depend on `frame-workspace` alone:
//!
//! - `desktop-shims` (default): the full frame service with the desktop
//!   bridges, re-exported as [`service`]
//! - `playback-only`: just the scheduler and renderer, re-exported as
//!   [`playback`], for hosts that receive photos some other way

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "playback-only")]
pub use core_playback as playback;
