//! # Sync Module
//!
//! Reconciles the local photo cache with the remote manifest.
//!
//! ## Overview
//!
//! - [`Reconciler`] diffs a manifest against the cache and persisted state,
//!   deletes what is gone, downloads what is new and trims to capacity.
//! - [`DownloadPool`] fetches photos with a bounded number of workers
//!   pulling from one [`DownloadQueue`].
//! - [`Downloader`] performs one fetch, checks integrity and detects the
//!   media type.
//! - [`SingleFlight`] keeps reconciles from overlapping.

pub mod download;
pub mod error;
pub mod media;
pub mod pool;
pub mod reconciler;
pub mod single_flight;

pub use download::{DownloadedPhoto, Downloader};
pub use error::{DownloadError, Result, SyncError};
pub use media::detect_media_type;
pub use pool::{DownloadFailure, DownloadPool, DownloadQueue, PoolOutcome};
pub use reconciler::{ReconcileReport, Reconciler, ReconcilerConfig};
pub use single_flight::{FlightGuard, SingleFlight};
