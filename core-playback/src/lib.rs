//! # Playback Module
//!
//! Decides which cached photo is on screen and crossfades to it.
//!
//! ## Overview
//!
//! - [`schedule`] holds the pure slide arithmetic: inventory and sync
//!   indices, the delay to the next boundary and the play order.
//! - [`PlaybackScheduler`] applies it to the persisted manifest and the
//!   current cache contents.
//! - [`Renderer`] performs decode-before-swap transitions between two
//!   layers of a [`DisplaySurface`](bridge_traits::display::DisplaySurface).

pub mod error;
pub mod renderer;
pub mod schedule;
pub mod scheduler;

pub use error::{PlaybackError, Result};
pub use renderer::{RenderOutcome, Renderer};
pub use schedule::{
    inventory_index, ms_until_next_boundary, next_change_in_ms, play_order, scheduled_index,
    sync_index,
};
pub use scheduler::{PlaybackScheduler, Slot};
