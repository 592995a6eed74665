//! # Frame Configuration Module
//!
//! Provides configuration management for the photo frame core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `FrameConfig`
//! holding every tunable of the sync and playback loops. Validation is
//! fail-fast: `build()` rejects values that would make a loop spin or never
//! make progress.
//!
//! Platform bridges (HTTP, storage, timers, display) are not part of the
//! config; they are injected through the service context.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::FrameConfig;
//! use std::time::Duration;
//!
//! let config = FrameConfig::builder()
//!     .database_path("/var/lib/frame/frame.db")
//!     .default_manifest_url("https://photos.example.com/manifest.json")
//!     .poll_interval(Duration::from_secs(300))
//!     .max_cached_photos(150)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::FrameConfig;
//!
//! let config = FrameConfig::builder()
//!     .database_path("")
//!     .build()
//!     .expect("Should fail - empty database path");
//! ```

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Manifest location used when neither an override nor a persisted URL exists
pub const DEFAULT_MANIFEST_URL: &str = "http://127.0.0.1:8080/manifest.json";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_CACHED_PHOTOS: usize = 200;
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_FADE_DURATION: Duration = Duration::from_millis(1200);
pub const DEFAULT_RECHECK_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Photo frame configuration.
///
/// Use [`FrameConfigBuilder`] to construct instances.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameConfig {
    /// Path to the SQLite database holding the photo cache and sync state
    pub database_path: PathBuf,

    /// Compiled-in manifest location, lowest precedence
    pub default_manifest_url: String,

    /// Manifest location supplied at startup. When set it is persisted and
    /// wins over any previously stored location.
    pub manifest_url_override: Option<String>,

    /// Time between manifest checks
    pub poll_interval: Duration,

    /// Cache capacity; oldest inserted photos beyond this are evicted
    pub max_cached_photos: usize,

    /// Download worker pool size
    pub max_concurrent_downloads: usize,

    /// Pause a worker takes after a failed download
    pub failure_backoff: Duration,

    /// Crossfade length
    pub fade_duration: Duration,

    /// Append `_=<unix millis>` to manifest requests to defeat CDN caching
    pub cache_bust: bool,

    /// Check downloaded payloads against the manifest's sha256
    pub verify_integrity: bool,

    /// Delay before the early recheck that follows a stale photo URL
    pub recheck_delay: Duration,

    /// Capacity of the event broadcast channel
    pub event_buffer_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("frame.db"),
            default_manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            manifest_url_override: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_cached_photos: DEFAULT_MAX_CACHED_PHOTOS,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
            fade_duration: DEFAULT_FADE_DURATION,
            cache_bust: true,
            verify_integrity: true,
            recheck_delay: DEFAULT_RECHECK_DELAY,
            event_buffer_size: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl FrameConfig {
    /// Creates a new builder for constructing a `FrameConfig`.
    pub fn builder() -> FrameConfigBuilder {
        FrameConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Default manifest URL is not blank
    /// - Poll interval and recheck delay are non-zero
    /// - Cache capacity, worker count and event buffer are at least 1
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.default_manifest_url.trim().is_empty() {
            return Err(Error::Config(
                "Default manifest URL cannot be empty".to_string(),
            ));
        }

        if let Some(url) = &self.manifest_url_override {
            if url.trim().is_empty() {
                return Err(Error::Config(
                    "Manifest URL override cannot be blank; omit it instead".to_string(),
                ));
            }
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Poll interval must be greater than zero".to_string(),
            ));
        }

        if self.recheck_delay.is_zero() {
            return Err(Error::Config(
                "Recheck delay must be greater than zero".to_string(),
            ));
        }

        if self.max_cached_photos == 0 {
            return Err(Error::Config(
                "Max cached photos must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config(
                "Max concurrent downloads must be at least 1".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`FrameConfig`] instances.
///
/// Unset fields take the defaults listed on the `DEFAULT_*` constants.
#[derive(Debug, Default)]
pub struct FrameConfigBuilder {
    database_path: Option<PathBuf>,
    default_manifest_url: Option<String>,
    manifest_url_override: Option<String>,
    poll_interval: Option<Duration>,
    max_cached_photos: Option<usize>,
    max_concurrent_downloads: Option<usize>,
    failure_backoff: Option<Duration>,
    fade_duration: Option<Duration>,
    cache_bust: Option<bool>,
    verify_integrity: Option<bool>,
    recheck_delay: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl FrameConfigBuilder {
    /// Sets the database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::FrameConfig;
    ///
    /// let builder = FrameConfig::builder()
    ///     .database_path("/var/lib/frame/frame.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn default_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.default_manifest_url = Some(url.into());
        self
    }

    /// Sets a runtime manifest URL that takes precedence over anything stored.
    pub fn manifest_url_override(mut self, url: impl Into<String>) -> Self {
        self.manifest_url_override = Some(url.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn max_cached_photos(mut self, max: usize) -> Self {
        self.max_cached_photos = Some(max);
        self
    }

    pub fn max_concurrent_downloads(mut self, workers: usize) -> Self {
        self.max_concurrent_downloads = Some(workers);
        self
    }

    pub fn failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = Some(backoff);
        self
    }

    pub fn fade_duration(mut self, fade: Duration) -> Self {
        self.fade_duration = Some(fade);
        self
    }

    pub fn cache_bust(mut self, enabled: bool) -> Self {
        self.cache_bust = Some(enabled);
        self
    }

    pub fn verify_integrity(mut self, enabled: bool) -> Self {
        self.verify_integrity = Some(enabled);
        self
    }

    pub fn recheck_delay(mut self, delay: Duration) -> Self {
        self.recheck_delay = Some(delay);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds and validates the final `FrameConfig`.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::FrameConfig;
    ///
    /// let config = FrameConfig::builder()
    ///     .database_path("/tmp/frame.db")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.max_concurrent_downloads, 4);
    /// ```
    pub fn build(self) -> Result<FrameConfig> {
        let defaults = FrameConfig::default();

        let config = FrameConfig {
            database_path: self.database_path.unwrap_or(defaults.database_path),
            default_manifest_url: self
                .default_manifest_url
                .unwrap_or(defaults.default_manifest_url),
            manifest_url_override: self.manifest_url_override,
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            max_cached_photos: self.max_cached_photos.unwrap_or(defaults.max_cached_photos),
            max_concurrent_downloads: self
                .max_concurrent_downloads
                .unwrap_or(defaults.max_concurrent_downloads),
            failure_backoff: self.failure_backoff.unwrap_or(defaults.failure_backoff),
            fade_duration: self.fade_duration.unwrap_or(defaults.fade_duration),
            cache_bust: self.cache_bust.unwrap_or(defaults.cache_bust),
            verify_integrity: self.verify_integrity.unwrap_or(defaults.verify_integrity),
            recheck_delay: self.recheck_delay.unwrap_or(defaults.recheck_delay),
            event_buffer_size: self.event_buffer_size.unwrap_or(defaults.event_buffer_size),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = FrameConfig::builder()
            .database_path("/tmp/frame.db")
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/frame.db"));
        assert_eq!(config.default_manifest_url, DEFAULT_MANIFEST_URL);
        assert_eq!(config.manifest_url_override, None);
        assert_eq!(config.max_cached_photos, 200);
        assert_eq!(config.max_concurrent_downloads, 4);
        assert_eq!(config.failure_backoff, Duration::from_millis(500));
        assert_eq!(config.recheck_delay, Duration::from_secs(60));
        assert!(config.cache_bust);
        assert!(config.verify_integrity);
    }

    #[test]
    fn test_builder_overrides() {
        let config = FrameConfig::builder()
            .database_path("frame.db")
            .default_manifest_url("https://a.example.com/manifest.json")
            .manifest_url_override("https://b.example.com/manifest.json")
            .poll_interval(Duration::from_secs(30))
            .max_cached_photos(10)
            .max_concurrent_downloads(2)
            .failure_backoff(Duration::from_millis(50))
            .fade_duration(Duration::from_millis(0))
            .cache_bust(false)
            .verify_integrity(false)
            .recheck_delay(Duration::from_secs(5))
            .event_buffer_size(8)
            .build()
            .unwrap();

        assert_eq!(
            config.manifest_url_override.as_deref(),
            Some("https://b.example.com/manifest.json")
        );
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.max_cached_photos, 10);
        assert_eq!(config.max_concurrent_downloads, 2);
        assert!(!config.cache_bust);
        assert!(!config.verify_integrity);
        assert_eq!(config.event_buffer_size, 8);
    }

    #[test]
    fn test_empty_database_path_rejected() {
        let result = FrameConfig::builder().database_path("").build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Database path")));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = FrameConfig::builder()
            .poll_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Poll interval")));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = FrameConfig::builder().max_cached_photos(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = FrameConfig::builder().max_concurrent_downloads(0).build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("concurrent")));
    }

    #[test]
    fn test_blank_override_rejected() {
        let result = FrameConfig::builder().manifest_url_override("   ").build();
        assert!(result.is_err());
    }
}
