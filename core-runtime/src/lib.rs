//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the photo frame core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other frame crate depends
//! on. It establishes the logging conventions, the validated configuration
//! and the event broadcasting used by the sync and playback loops.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{FrameConfig, FrameConfigBuilder};
pub use error::{Error, Result};
pub use events::{EventBus, FrameEvent};
