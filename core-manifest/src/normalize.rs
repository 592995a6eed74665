//! Lenient manifest normalization
//!
//! Manifests are produced by more than one publisher script and sometimes
//! edited by hand, so parsing is forgiving about field types and strict only
//! about structure:
//!
//! - numeric fields accept JSON numbers or numeric strings
//! - non-positive or unparseable optional numbers are dropped
//! - unknown `mode` values fall back to inventory
//! - blank ids are dropped, duplicate ids keep the first occurrence
//! - blank URLs become placeholders
//! - a legacy `images: ["a.jpg", ...]` list becomes url-less placeholders
//! - a document with neither `photos` nor `images` is rejected
//! - a `photos` document needs a non-blank `version`; legacy documents may
//!   omit it

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ManifestError, Result};
use crate::model::{Manifest, PhotoRef, PlaybackMode, DEFAULT_SCHEMA, DEFAULT_SLIDE_SECONDS};

/// Parse and normalize a manifest body
pub fn parse_manifest(body: &[u8]) -> Result<Manifest> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ManifestError::Parse(format!("Invalid JSON: {}", e)))?;
    normalize_manifest(&value)
}

/// Normalize an already-decoded JSON document
pub fn normalize_manifest(value: &Value) -> Result<Manifest> {
    let doc = value
        .as_object()
        .ok_or_else(|| ManifestError::Parse("Manifest must be a JSON object".to_string()))?;

    let version = doc.get("version").and_then(scalar_string);
    let (photos, version) = match (doc.get("photos"), doc.get("images")) {
        (Some(photos), _) => {
            let version = version.ok_or_else(|| {
                ManifestError::Parse("Manifest is missing `version`".to_string())
            })?;
            (normalize_photos(photos)?, version)
        }
        (None, Some(images)) => (normalize_legacy_images(images)?, version.unwrap_or_default()),
        (None, None) => {
            return Err(ManifestError::Parse(
                "Manifest has neither `photos` nor `images`".to_string(),
            ))
        }
    };

    let manifest = Manifest {
        schema: doc
            .get("schema")
            .and_then(positive_i64)
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(DEFAULT_SCHEMA),
        version,
        generated_at: doc.get("generated_at").and_then(parse_timestamp),
        start_epoch: doc.get("start_epoch").and_then(positive_i64),
        slide_seconds: doc
            .get("slide_seconds")
            .and_then(positive_i64)
            .map(|s| s as u64)
            .unwrap_or(DEFAULT_SLIDE_SECONDS),
        mode: doc
            .get("mode")
            .and_then(Value::as_str)
            .map(PlaybackMode::parse_lenient)
            .unwrap_or_default(),
        photos,
    };

    debug!(
        version = %manifest.version,
        mode = manifest.mode.as_str(),
        photos = manifest.photos.len(),
        slide_seconds = manifest.slide_seconds,
        "Normalized manifest"
    );

    Ok(manifest)
}

fn normalize_photos(value: &Value) -> Result<Vec<PhotoRef>> {
    let entries = value
        .as_array()
        .ok_or_else(|| ManifestError::Parse("`photos` must be an array".to_string()))?;

    let mut seen = HashSet::new();
    let mut photos = Vec::with_capacity(entries.len());

    for entry in entries {
        let photo = match entry {
            Value::Object(fields) => photo_from_object(fields),
            // Bare ids are tolerated the same way as legacy `images`
            Value::String(_) | Value::Number(_) => scalar_string(entry).map(PhotoRef::placeholder),
            _ => None,
        };

        let Some(photo) = photo else {
            debug!(?entry, "Dropping manifest entry without a usable id");
            continue;
        };

        if seen.insert(photo.id.clone()) {
            photos.push(photo);
        } else {
            debug!(id = %photo.id, "Dropping duplicate manifest entry");
        }
    }

    Ok(photos)
}

fn normalize_legacy_images(value: &Value) -> Result<Vec<PhotoRef>> {
    let entries = value
        .as_array()
        .ok_or_else(|| ManifestError::Parse("`images` must be an array".to_string()))?;

    let mut seen = HashSet::new();
    Ok(entries
        .iter()
        .filter_map(scalar_string)
        .filter(|id| seen.insert(id.clone()))
        .map(PhotoRef::placeholder)
        .collect())
}

fn photo_from_object(fields: &Map<String, Value>) -> Option<PhotoRef> {
    let id = fields.get("id").and_then(scalar_string)?;

    Some(PhotoRef {
        id,
        url: fields.get("url").and_then(non_blank_str),
        name: fields.get("name").and_then(non_blank_str),
        sha256: fields
            .get("sha256")
            .and_then(non_blank_str)
            .map(|h| h.to_ascii_lowercase()),
        bytes: fields.get("bytes").and_then(positive_i64).map(|b| b as u64),
    })
}

/// Trimmed, non-empty string from a string or number
fn scalar_string(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!raw.is_empty()).then_some(raw)
}

fn non_blank_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Strictly positive integer from a number or numeric string
fn positive_i64(value: &Value) -> Option<i64> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.floor() as i64)
            })
        }
        _ => None,
    };
    parsed.filter(|n| *n > 0)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| debug!(raw, error = %e, "Ignoring unparseable generated_at"))
        .ok()
}
