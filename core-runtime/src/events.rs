//! # Event Bus System
//!
//! Broadcasts typed frame events over `tokio::sync::broadcast` so that
//! diagnostics overlays, host shells and tests can observe the sync and
//! playback loops without coupling to them.
//!
//! ## Overview
//!
//! ```text
//! ┌────────────────┐   emit   ┌───────────┐  subscribe  ┌─────────────────┐
//! │ StatusReporter ├─────────>│           ├────────────>│ Diagnostics UI  │
//! └────────────────┘          │ EventBus  │             └─────────────────┘
//! ┌────────────────┐   emit   │ (broadcast│  subscribe  ┌─────────────────┐
//! │ Playback loop  ├─────────>│  channel) ├────────────>│ Test harness    │
//! └────────────────┘          └───────────┘             └─────────────────┘
//! ```
//!
//! Emitting never blocks and never fails the caller: with no subscribers the
//! event is dropped (`emit(..).ok()`).
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, FrameEvent, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(FrameEvent::Sync(SyncEvent::Unchanged {
//!     version: "v3".to_string(),
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Manifest unchanged");
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError, Receiver};

use crate::config::DEFAULT_EVENT_BUFFER;

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum FrameEvent {
    /// Lifecycle status change
    Status(StatusEvent),
    /// Sync cycle progress
    Sync(SyncEvent),
    /// Slide changes
    Playback(PlaybackEvent),
}

impl FrameEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            FrameEvent::Status(e) => e.text.as_str(),
            FrameEvent::Sync(e) => e.description(),
            FrameEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            FrameEvent::Status(StatusEvent { is_error: true, .. }) => EventSeverity::Error,
            FrameEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            FrameEvent::Sync(SyncEvent::Completed { failed, .. }) if *failed > 0 => {
                EventSeverity::Warning
            }
            FrameEvent::Playback(PlaybackEvent::Skipped { .. }) => EventSeverity::Warning,
            FrameEvent::Status(_) | FrameEvent::Sync(SyncEvent::Completed { .. }) => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// A lifecycle transition as shown on the diagnostics overlay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEvent {
    /// Machine-readable state name (`PLAYBACK`, `OFFLINE`, ...)
    pub state: String,
    /// Free-form status text
    pub text: String,
    pub is_error: bool,
}

// ============================================================================
// Sync Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A manifest check began.
    Started {
        /// Manifest URL with any query string removed
        url: String,
    },
    /// Version and signature matched the stored state; nothing to do.
    Unchanged { version: String },
    /// Reconcile finished (possibly with per-photo failures).
    Completed {
        version: String,
        downloaded: u64,
        deleted: u64,
        evicted: u64,
        failed: u64,
        stale_references: u64,
        duration_ms: u64,
    },
    /// The cycle aborted; cached content and state were left as they were.
    Failed { message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Checking manifest",
            SyncEvent::Unchanged { .. } => "Manifest unchanged",
            SyncEvent::Completed { .. } => "Sync completed",
            SyncEvent::Failed { .. } => "Sync failed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A photo became the visible layer.
    Shown { photo_id: String, index: u64, total: u64 },
    /// A scheduled photo could not be shown; the previous one stays up.
    Skipped { photo_id: String, reason: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Shown { .. } => "Photo shown",
            PlaybackEvent::Skipped { .. } => "Photo skipped",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`FrameEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FrameEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall more than `capacity` events behind receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: FrameEvent) -> Result<usize, SendError<FrameEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<FrameEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(8);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&FrameEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::new(16);
/// let errors_only = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<FrameEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<FrameEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FrameEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &FrameEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is gone.
    pub async fn recv(&mut self) -> Result<FrameEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<FrameEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(id: &str) -> FrameEvent {
        FrameEvent::Playback(PlaybackEvent::Shown {
            photo_id: id.to_string(),
            index: 0,
            total: 1,
        })
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_error() {
        let bus = EventBus::new(4);
        assert!(bus.emit(shown("a")).is_err());
    }

    #[tokio::test]
    async fn test_all_subscribers_receive() {
        let bus = EventBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.emit(shown("a")).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), shown("a"));
        assert_eq!(second.recv().await.unwrap(), shown("a"));
    }

    #[tokio::test]
    async fn test_stream_filter_skips_non_matching() {
        let bus = EventBus::new(8);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, FrameEvent::Sync(_)));

        bus.emit(shown("a")).ok();
        bus.emit(FrameEvent::Sync(SyncEvent::Failed {
            message: "timeout".to_string(),
        }))
        .ok();

        let event = stream.recv().await.unwrap();
        assert!(matches!(event, FrameEvent::Sync(SyncEvent::Failed { .. })));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for id in ["a", "b", "c", "d"] {
            bus.emit(shown(id)).ok();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(2)))));
    }

    #[test]
    fn test_severity() {
        let failed = FrameEvent::Sync(SyncEvent::Failed {
            message: "x".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let partial = FrameEvent::Sync(SyncEvent::Completed {
            version: "v2".to_string(),
            downloaded: 3,
            deleted: 0,
            evicted: 0,
            failed: 1,
            stale_references: 1,
            duration_ms: 40,
        });
        assert_eq!(partial.severity(), EventSeverity::Warning);

        let status = FrameEvent::Status(StatusEvent {
            state: "PLAYBACK".to_string(),
            text: "Playing 3 photos".to_string(),
            is_error: false,
        });
        assert_eq!(status.severity(), EventSeverity::Info);
        assert_eq!(status.description(), "Playing 3 photos");
        assert_eq!(shown("a").severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = FrameEvent::Sync(SyncEvent::Unchanged {
            version: "v9".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "Sync");
        assert_eq!(json["payload"]["event"], "Unchanged");
        assert_eq!(json["payload"]["version"], "v9");
    }
}
