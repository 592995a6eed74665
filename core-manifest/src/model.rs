//! Manifest domain types
//!
//! These are the normalized forms. Everything that reaches a `Manifest` has
//! already been through [`normalize`](crate::normalize), so ids are unique
//! and non-blank, URLs are non-blank, and numeric fields are positive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default slide length when the manifest does not specify one
pub const DEFAULT_SLIDE_SECONDS: u64 = 3600;

/// Schema assumed when the manifest omits `schema`
pub const DEFAULT_SCHEMA: u32 = 1;

/// How the frame picks the visible slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Index from absolute wall-clock time
    #[default]
    Inventory,
    /// Index from a shared start epoch so several frames show the same slide
    Sync,
}

impl PlaybackMode {
    /// Lenient parse: anything other than `sync` (case-insensitive) is inventory
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("sync") {
            PlaybackMode::Sync
        } else {
            PlaybackMode::Inventory
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::Inventory => "inventory",
            PlaybackMode::Sync => "sync",
        }
    }
}

/// One photo entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    /// Stable id, unique within a manifest
    pub id: String,
    /// Where to download the payload; `None` marks a placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lowercase hex sha256 of the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Expected payload size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

impl PhotoRef {
    /// Placeholder entry with only an id
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
            name: None,
            sha256: None,
            bytes: None,
        }
    }

    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::placeholder(id)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// Only entries with a URL are ever downloaded
    pub fn is_downloadable(&self) -> bool {
        self.url.is_some()
    }

    /// Name to show on screen, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Normalized manifest document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema: u32,
    /// Publisher-assigned content version
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Shared start of the slide sequence, unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_epoch: Option<i64>,
    pub slide_seconds: u64,
    pub mode: PlaybackMode,
    pub photos: Vec<PhotoRef>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA,
            version: String::new(),
            generated_at: None,
            start_epoch: None,
            slide_seconds: DEFAULT_SLIDE_SECONDS,
            mode: PlaybackMode::Inventory,
            photos: Vec::new(),
        }
    }
}

impl Manifest {
    pub fn new(version: impl Into<String>, photos: Vec<PhotoRef>) -> Self {
        Self {
            version: version.into(),
            photos,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: PlaybackMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_slide_seconds(mut self, seconds: u64) -> Self {
        self.slide_seconds = seconds;
        self
    }

    pub fn with_start_epoch(mut self, epoch: i64) -> Self {
        self.start_epoch = Some(epoch);
        self
    }

    /// Slide length in milliseconds
    pub fn slide_ms(&self) -> i64 {
        (self.slide_seconds.max(1) as i64).saturating_mul(1000)
    }

    /// Start epoch in milliseconds, when set
    pub fn start_ms(&self) -> Option<i64> {
        self.start_epoch.map(|s| s.saturating_mul(1000))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.photos.iter().map(|p| p.id.as_str())
    }

    pub fn photo(&self, id: &str) -> Option<&PhotoRef> {
        self.photos.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}
