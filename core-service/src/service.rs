//! # Frame Service
//!
//! Wires the manifest client, reconciler, scheduler and renderer together
//! and runs the two independent loops:
//!
//! - **sync loop**: one sync cycle per poll interval, or after the shorter
//!   recheck delay when the last cycle hit stale references
//! - **playback loop**: one tick per slide boundary, re-armed whenever a
//!   reconcile applies a new manifest
//!
//! A failed sync never interrupts playback; the frame keeps showing what is
//! cached.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::scheduler::interval;
use core_cache::{CacheStore, StateStore};
use core_manifest::{Manifest, ManifestClient};
use core_playback::{PlaybackScheduler, RenderOutcome, Renderer, Slot};
use core_runtime::{
    events::{FrameEvent, PlaybackEvent, StatusEvent, SyncEvent},
    logging::redact_url,
};
use core_sync::{ReconcileReport, Reconciler, ReconcilerConfig, SingleFlight, SyncError};
use serde::Serialize;
use tokio::sync::{Notify, OnceCell};
use tracing::{debug, error, info, instrument, warn};

use crate::context::{FrameContext, FrameContextBuilder};
use crate::error::{Result, ServiceError};
use crate::shutdown::ShutdownSignal;
use crate::state::FrameState;
use crate::status::{StatusReporter, StatusSnapshot};

/// How a sync cycle ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Unchanged { version: String },
    Reconciled(ReconcileReport),
    /// The manifest could not be fetched or parsed; nothing changed
    Offline { message: String },
}

/// Result of one [`FrameService::run_sync_cycle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncCycle {
    pub outcome: CycleOutcome,
    /// The force-recheck flag was set during this cycle
    pub recheck_early: bool,
}

pub struct FrameService {
    context: FrameContext,
    cache: Arc<CacheStore>,
    state: StateStore,
    manifests: ManifestClient,
    reconciler: Reconciler,
    scheduler: PlaybackScheduler,
    renderer: Renderer,
    status: StatusReporter,
    sync_flight: SingleFlight,
    /// Set once the configured URL override has been written to state
    configured_url: OnceCell<()>,
    schedule_changed: Notify,
}

impl FrameService {
    pub fn new(context: FrameContext) -> Self {
        let config = &context.config;
        let cache = Arc::new(CacheStore::new(context.store.clone()));
        let state = StateStore::new(context.store.clone());

        let manifests = ManifestClient::new(context.http.clone(), context.clock.clone())
            .with_cache_bust(config.cache_bust);
        let reconciler = Reconciler::new(
            cache.clone(),
            state.clone(),
            context.http.clone(),
            context.clock.clone(),
            context.timers.clone(),
            ReconcilerConfig::from(config),
        );
        let scheduler = PlaybackScheduler::new(cache.clone(), state.clone());
        let renderer = Renderer::new(
            context.surface.clone(),
            cache.clone(),
            context.timers.clone(),
            config.fade_duration,
        );
        let status = StatusReporter::new(
            context.events.clone(),
            state.clone(),
            context.clock.clone(),
        );

        Self {
            context,
            cache,
            state,
            manifests,
            reconciler,
            scheduler,
            renderer,
            status,
            sync_flight: SingleFlight::new(),
            configured_url: OnceCell::new(),
            schedule_changed: Notify::new(),
        }
    }

    /// Build the context and the service. A storage failure here is the
    /// one fatal condition: it is broadcast as a `FATAL` status and
    /// returned.
    pub async fn bootstrap(mut builder: FrameContextBuilder) -> Result<Self> {
        let events = builder.event_bus();
        match builder.build().await {
            Ok(context) => {
                let service = Self::new(context);
                if let Err(e) = service.adopt_configured_url().await {
                    warn!(error = %e, "Could not persist configured manifest URL");
                }
                Ok(service)
            }
            Err(e @ ServiceError::Storage(_)) => {
                let state = FrameState::Fatal;
                error!(state = %state, error = %e, "Cannot start without local storage");
                let _ = events.emit(FrameEvent::Status(StatusEvent {
                    state: state.as_str().to_string(),
                    text: e.to_string(),
                    is_error: true,
                }));
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub fn context(&self) -> &FrameContext {
        &self.context
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state
    }

    pub fn current_state(&self) -> FrameState {
        self.status.current_state()
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.status.snapshot(&self.cache).await
    }

    /// Last manifest applied by a completed reconcile
    pub async fn manifest(&self) -> Result<Option<Manifest>> {
        Ok(self.state.manifest().await?)
    }

    /// Point the frame at a different manifest. Persisted; `None` reverts
    /// to the configured default.
    pub async fn set_manifest_url(&self, url: Option<&str>) -> Result<()> {
        self.adopt_configured_url().await?;
        self.state.set_manifest_url_override(url).await?;
        info!(url = ?url.map(redact_url), "Manifest URL override updated");
        Ok(())
    }

    /// The URL the next cycle will fetch
    pub async fn manifest_url(&self) -> Result<String> {
        self.adopt_configured_url().await?;
        Ok(self
            .state
            .resolve_manifest_url(&self.context.config.default_manifest_url)
            .await?)
    }

    /// Persist `FrameConfig::manifest_url_override` once per service, so
    /// later runtime overrides are not clobbered by it.
    async fn adopt_configured_url(&self) -> Result<()> {
        self.configured_url
            .get_or_try_init(|| async {
                if let Some(url) = &self.context.config.manifest_url_override {
                    self.state.set_manifest_url_override(Some(url.as_str())).await?;
                    info!(url = %redact_url(url), "Adopted configured manifest URL");
                }
                Ok::<(), ServiceError>(())
            })
            .await?;
        Ok(())
    }

    /// Show whatever the cache holds before the first sync
    pub async fn start(&self) -> Option<Slot> {
        self.status
            .transition(FrameState::PlayFromCache, "Playing from cache");
        self.playback_tick().await
    }

    /// One manifest check and, when needed, a reconcile.
    ///
    /// Fetch, parse and storage problems end the cycle in
    /// [`CycleOutcome::Offline`]; they are reported, not returned.
    ///
    /// # Errors
    ///
    /// `SyncError::Busy` if another cycle is still running.
    #[instrument(skip(self))]
    pub async fn run_sync_cycle(&self) -> Result<SyncCycle> {
        let _flight = self
            .sync_flight
            .try_begin()
            .ok_or(ServiceError::Sync(SyncError::Busy))?;

        match self.state.take_force_recheck().await {
            Ok(true) => debug!("Cycle triggered by force-recheck"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Could not read force-recheck flag"),
        }

        let outcome = self.check_and_reconcile().await;

        if let CycleOutcome::Offline { message } = &outcome {
            self.emit(FrameEvent::Sync(SyncEvent::Failed {
                message: message.clone(),
            }));
            self.status
                .failure(FrameState::Offline, format!("Offline: {}", message))
                .await;
        }

        let recheck_early = self.state.force_recheck().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read force-recheck flag");
            false
        });

        if !matches!(outcome, CycleOutcome::Offline { .. }) {
            self.status.transition(FrameState::Playback, "Playing");
        }
        self.playback_tick().await;

        Ok(SyncCycle {
            outcome,
            recheck_early,
        })
    }

    async fn check_and_reconcile(&self) -> CycleOutcome {
        self.status
            .transition(FrameState::SyncCheck, "Checking manifest");

        let url = match self.manifest_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Could not resolve stored manifest URL, using configuration");
                let config = &self.context.config;
                config
                    .manifest_url_override
                    .clone()
                    .unwrap_or_else(|| config.default_manifest_url.clone())
            }
        };
        self.emit(FrameEvent::Sync(SyncEvent::Started {
            url: redact_url(&url),
        }));

        let manifest = match self.manifests.fetch(&url).await {
            Ok(manifest) => manifest,
            Err(e) => {
                return CycleOutcome::Offline {
                    message: e.to_string(),
                }
            }
        };

        let report = match self.reconciler.reconcile(&manifest).await {
            Ok(report) => report,
            Err(e) => {
                return CycleOutcome::Offline {
                    message: e.to_string(),
                }
            }
        };

        if !report.changed {
            self.status.transition(
                FrameState::Unchanged,
                format!("Manifest {} unchanged", manifest.version),
            );
            self.status.clear_error().await;
            self.emit(FrameEvent::Sync(SyncEvent::Unchanged {
                version: manifest.version.clone(),
            }));
            return CycleOutcome::Unchanged {
                version: manifest.version,
            };
        }

        let summary = format!(
            "Manifest {}: {} downloaded, {} deleted, {} failed, {} evicted",
            manifest.version,
            report.downloaded.len(),
            report.deleted.len(),
            report.failed.len(),
            report.evicted.len()
        );
        if report.is_complete() {
            self.status.transition(FrameState::Reconcile, summary);
            self.status.clear_error().await;
        } else {
            // Partial reconcile: report it but stay out of OFFLINE
            self.status.transition(FrameState::Reconcile, summary.clone());
            if let Err(e) = self.state.set_last_error(Some(&summary)).await {
                warn!(error = %e, "Could not persist last error");
            }
        }

        self.schedule_changed.notify_one();
        self.emit(FrameEvent::Sync(SyncEvent::Completed {
            version: manifest.version.clone(),
            downloaded: report.downloaded.len() as u64,
            deleted: report.deleted.len() as u64,
            evicted: report.evicted.len() as u64,
            failed: report.failed.len() as u64,
            stale_references: report.stale_references.len() as u64,
            duration_ms: report.duration_ms,
        }));

        CycleOutcome::Reconciled(report)
    }

    /// Show the slide due now if it changed. Errors are logged and the
    /// previous slide stays up.
    pub async fn playback_tick(&self) -> Option<Slot> {
        let now = self.context.clock.unix_timestamp_millis();

        let slot = match self.scheduler.tick(now).await {
            Ok(Some(slot)) => slot,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Could not compute scheduled slide");
                return None;
            }
        };

        match self.renderer.show_by_id(&slot.id).await {
            Ok(RenderOutcome::Shown) => {
                self.emit(FrameEvent::Playback(PlaybackEvent::Shown {
                    photo_id: slot.id.clone(),
                    index: slot.index as u64,
                    total: slot.total as u64,
                }));
                Some(slot)
            }
            Ok(RenderOutcome::Unchanged) => None,
            Err(e) => {
                warn!(id = %slot.id, error = %e, "Skipping slide");
                self.scheduler.reset().await;
                self.emit(FrameEvent::Playback(PlaybackEvent::Skipped {
                    photo_id: slot.id,
                    reason: e.to_string(),
                }));
                None
            }
        }
    }

    /// Run the sync and playback loops until `shutdown` fires
    pub async fn run(&self, shutdown: ShutdownSignal) {
        info!("Frame service running");
        self.start().await;
        tokio::join!(
            self.sync_loop(shutdown.clone()),
            self.playback_loop(shutdown)
        );
        info!("Frame service stopped");
    }

    async fn sync_loop(&self, mut shutdown: ShutdownSignal) {
        let config = &self.context.config;
        let mut ticker = interval(self.context.timers.clone(), config.poll_interval);
        while !shutdown.is_triggered() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.wait() => break,
            }

            match self.run_sync_cycle().await {
                Ok(cycle) if cycle.recheck_early => ticker.reset_after(config.recheck_delay),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Sync cycle skipped"),
            }
        }
    }

    async fn playback_loop(&self, mut shutdown: ShutdownSignal) {
        while !shutdown.is_triggered() {
            let now = self.context.clock.unix_timestamp_millis();
            let delay = self.scheduler.delay_until_next(now).await.max(1) as u64;

            tokio::select! {
                _ = self.context.timers.sleep(Duration::from_millis(delay)) => {
                    self.playback_tick().await;
                }
                // The sync cycle already showed the new slide; only the
                // timer needs re-arming
                _ = self.schedule_changed.notified() => {
                    debug!("Slide schedule changed");
                }
                _ = shutdown.wait() => break,
            }
        }
    }

    fn emit(&self, event: FrameEvent) {
        // No subscribers is fine
        let _ = self.context.events.emit(event);
    }
}
