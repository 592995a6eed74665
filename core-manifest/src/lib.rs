//! # Manifest Module
//!
//! Retrieval and normalization of the remote photo manifest.
//!
//! ## Overview
//!
//! The manifest is a JSON document published next to the photos:
//!
//! ```json
//! {
//!   "schema": 1,
//!   "version": "v20240501-120000Z",
//!   "generated_at": "2024-05-01T12:00:00Z",
//!   "mode": "sync",
//!   "start_epoch": 1714564800,
//!   "slide_seconds": 3600,
//!   "photos": [{"id": "a.jpg", "url": "https://...", "name": "a", "sha256": "...", "bytes": 1024}]
//! }
//! ```
//!
//! [`ManifestClient`] fetches it, [`normalize`] turns loosely typed input into
//! a [`Manifest`], and [`manifest_signature`] produces the stable hash the
//! reconciler compares against persisted state.

pub mod client;
pub mod error;
pub mod model;
pub mod normalize;
pub mod signature;

pub use client::ManifestClient;
pub use error::{ManifestError, Result};
pub use model::{Manifest, PhotoRef, PlaybackMode, DEFAULT_SLIDE_SECONDS};
pub use normalize::parse_manifest;
pub use signature::manifest_signature;
