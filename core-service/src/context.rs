//! # Frame Context
//!
//! The explicit bundle of configuration and host bridges the service runs
//! on. Nothing in the core reaches for globals; everything comes through
//! here.
//!
//! With the `desktop-shims` feature, bridges that are not injected are
//! filled with the `bridge-desktop` implementations: reqwest for HTTP,
//! SQLite at `database_path` for storage, tokio timers and the headless
//! image surface. Without it every bridge must be provided.
//!
//! ```ignore
//! let config = FrameConfig::builder()
//!     .database_path("/var/lib/frame/frame.db")
//!     .build()?;
//! let context = FrameContext::builder(config)
//!     .surface(Arc::new(MyFramebuffer::new()))
//!     .build()
//!     .await?;
//! ```

use std::sync::Arc;

use bridge_traits::{
    display::DisplaySurface,
    http::HttpClient,
    scheduler::TimerScheduler,
    storage::KeyValueStore,
    time::{Clock, SystemClock},
};
use core_runtime::{config::FrameConfig, events::EventBus};
use tracing::info;

use crate::error::{Result, ServiceError};

#[derive(Clone)]
pub struct FrameContext {
    pub config: FrameConfig,
    pub http: Arc<dyn HttpClient>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub timers: Arc<dyn TimerScheduler>,
    pub surface: Arc<dyn DisplaySurface>,
    pub events: EventBus,
}

impl FrameContext {
    pub fn builder(config: FrameConfig) -> FrameContextBuilder {
        FrameContextBuilder::new(config)
    }
}

pub struct FrameContextBuilder {
    config: FrameConfig,
    http: Option<Arc<dyn HttpClient>>,
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    timers: Option<Arc<dyn TimerScheduler>>,
    surface: Option<Arc<dyn DisplaySurface>>,
    events: Option<EventBus>,
}

impl FrameContextBuilder {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            http: None,
            store: None,
            clock: None,
            timers: None,
            surface: None,
            events: None,
        }
    }

    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to the system clock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn timers(mut self, timers: Arc<dyn TimerScheduler>) -> Self {
        self.timers = Some(timers);
        self
    }

    pub fn surface(mut self, surface: Arc<dyn DisplaySurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Share an existing bus; otherwise one is created with the configured
    /// buffer size
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// The bus the built context will use, created now if none was injected
    pub fn event_bus(&mut self) -> EventBus {
        self.events
            .get_or_insert_with(|| EventBus::new(self.config.event_buffer_size))
            .clone()
    }

    /// Validate the config and fill in missing bridges.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Config` for an invalid configuration
    /// - `ServiceError::Storage` if the default store cannot be opened
    /// - `ServiceError::CapabilityMissing` if a bridge is absent and no
    ///   default is available
    pub async fn build(self) -> Result<FrameContext> {
        self.config.validate()?;

        let store = match self.store {
            Some(store) => store,
            None => provide_default_store(&self.config).await?,
        };
        let http = match self.http {
            Some(http) => http,
            None => provide_default_http()?,
        };
        let timers = match self.timers {
            Some(timers) => timers,
            None => provide_default_timers()?,
        };
        let surface = match self.surface {
            Some(surface) => surface,
            None => provide_default_surface()?,
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let events = self
            .events
            .unwrap_or_else(|| EventBus::new(self.config.event_buffer_size));

        info!(
            database = %self.config.database_path.display(),
            poll_secs = self.config.poll_interval.as_secs(),
            "Frame context ready"
        );

        Ok(FrameContext {
            config: self.config,
            http,
            store,
            clock,
            timers,
            surface,
            events,
        })
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn missing(capability: &str, hint: &str) -> ServiceError {
    ServiceError::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required. Enable the 'desktop-shims' feature or inject {}.",
            capability, hint
        ),
    }
}

#[cfg(feature = "desktop-shims")]
async fn provide_default_store(config: &FrameConfig) -> Result<Arc<dyn KeyValueStore>> {
    use bridge_desktop::SqliteKeyValueStore;

    let store = SqliteKeyValueStore::new(config.database_path.clone())
        .await
        .map_err(|e| ServiceError::Storage(e.to_string()))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
async fn provide_default_store(_config: &FrameConfig) -> Result<Arc<dyn KeyValueStore>> {
    Err(missing("KeyValueStore", "a durable store"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| ServiceError::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http() -> Result<Arc<dyn HttpClient>> {
    Err(missing("HttpClient", "a platform HTTP client"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_timers() -> Result<Arc<dyn TimerScheduler>> {
    Ok(Arc::new(bridge_desktop::TokioScheduler::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_timers() -> Result<Arc<dyn TimerScheduler>> {
    Err(missing("TimerScheduler", "a host timer"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_surface() -> Result<Arc<dyn DisplaySurface>> {
    Ok(Arc::new(bridge_desktop::ImageSurface::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_surface() -> Result<Arc<dyn DisplaySurface>> {
    Err(missing("DisplaySurface", "the host display"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::scheduler::ManualScheduler;
    use bridge_traits::storage::MemoryKeyValueStore;
    use bridge_traits::time::ManualClock;

    fn config() -> FrameConfig {
        FrameConfig::builder()
            .database_path("/tmp/frame-context-test.db")
            .build()
            .unwrap()
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_desktop_defaults_fill_missing_bridges() {
        let clock = Arc::new(ManualClock::from_millis(0));
        let context = FrameContext::builder(config())
            .store(Arc::new(MemoryKeyValueStore::new()))
            .clock(clock.clone())
            .timers(Arc::new(ManualScheduler::new(clock)))
            .build()
            .await
            .unwrap();

        assert_eq!(context.clock.unix_timestamp_millis(), 0);
        assert_eq!(context.events.subscriber_count(), 0);
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[tokio::test]
    async fn test_missing_bridge_is_reported() {
        let err = FrameContext::builder(config())
            .store(Arc::new(MemoryKeyValueStore::new()))
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::CapabilityMissing { .. }));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut bad = config();
        bad.max_concurrent_downloads = 0;

        let result = FrameContext::builder(bad)
            .store(Arc::new(MemoryKeyValueStore::new()))
            .build()
            .await;
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }
}
