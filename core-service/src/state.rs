//! Frame lifecycle states

use serde::Serialize;
use std::fmt;

/// Where the frame is in its lifecycle.
///
/// ```text
/// INIT -> PLAY_FROM_CACHE -> SYNC_CHECK -> UNCHANGED ----------> PLAYBACK
///                                |      -> RECONCILE ----------> PLAYBACK
///                                +-> OFFLINE (playback continues)
/// ```
///
/// Every state except `FATAL` leads back to `SYNC_CHECK` on the next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameState {
    Init,
    PlayFromCache,
    SyncCheck,
    Unchanged,
    Reconcile,
    Playback,
    Offline,
    /// Storage could not be opened at startup
    Fatal,
}

impl FrameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameState::Init => "INIT",
            FrameState::PlayFromCache => "PLAY_FROM_CACHE",
            FrameState::SyncCheck => "SYNC_CHECK",
            FrameState::Unchanged => "UNCHANGED",
            FrameState::Reconcile => "RECONCILE",
            FrameState::Playback => "PLAYBACK",
            FrameState::Offline => "OFFLINE",
            FrameState::Fatal => "FATAL",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FrameState::Offline | FrameState::Fatal)
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
