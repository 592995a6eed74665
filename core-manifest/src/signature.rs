//! Stable content signature for a manifest
//!
//! Two manifests with the same signature produce the same cache contents and
//! the same slide schedule. `generated_at`, `schema`, display names and
//! declared sizes are not signed; republishing an identical set does not
//! trigger a reconcile.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::{Manifest, PlaybackMode};

#[derive(Serialize)]
struct SignedFields<'a> {
    version: &'a str,
    start_epoch: Option<i64>,
    slide_seconds: u64,
    mode: PlaybackMode,
    photos: Vec<(&'a str, Option<&'a str>, Option<&'a str>)>,
}

/// Hex sha256 over version, start epoch, slide length, mode and the ordered
/// `(id, url, sha256)` triples.
pub fn manifest_signature(manifest: &Manifest) -> String {
    let fields = SignedFields {
        version: &manifest.version,
        start_epoch: manifest.start_epoch,
        slide_seconds: manifest.slide_seconds,
        mode: manifest.mode,
        photos: manifest
            .photos
            .iter()
            .map(|p| (p.id.as_str(), p.url.as_deref(), p.sha256.as_deref()))
            .collect(),
    };

    // Serializing a struct of borrowed primitives cannot fail.
    let canonical = serde_json::to_vec(&fields).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}
