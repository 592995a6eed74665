//! Single-photo download with integrity checks

use std::sync::Arc;

use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use core_manifest::PhotoRef;
use core_runtime::logging::redact_url;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::DownloadError;
use crate::media::detect_media_type;

/// A fetched payload, not yet cached
#[derive(Debug, Clone)]
pub struct DownloadedPhoto {
    pub payload: Bytes,
    pub media_type: String,
}

pub struct Downloader {
    http: Arc<dyn HttpClient>,
    verify_integrity: bool,
}

impl Downloader {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            verify_integrity: true,
        }
    }

    pub fn with_verify_integrity(mut self, enabled: bool) -> Self {
        self.verify_integrity = enabled;
        self
    }

    /// Fetch the payload for `photo`.
    ///
    /// Placeholders never reach this point; a missing URL is reported as a
    /// transport error.
    pub async fn fetch(&self, photo: &PhotoRef) -> Result<DownloadedPhoto, DownloadError> {
        let url = photo
            .url
            .as_deref()
            .ok_or_else(|| DownloadError::Transport(format!("{} has no URL", photo.id)))?;

        debug!(id = %photo.id, url = %redact_url(url), "Downloading photo");

        let response = self
            .http
            .execute(HttpRequest::get(url))
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(DownloadError::Status {
                status: response.status,
            });
        }

        if let Some(expected) = photo.bytes {
            let actual = response.body.len() as u64;
            if actual != expected {
                warn!(id = %photo.id, expected, actual, "Payload size differs from manifest");
            }
        }

        if self.verify_integrity {
            if let Some(expected) = photo.sha256.as_deref() {
                let actual = hex::encode(Sha256::digest(&response.body));
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(DownloadError::Integrity {
                        expected: expected.to_string(),
                        actual,
                    });
                }
            }
        }

        let media_type = detect_media_type(
            response.header("content-type"),
            &photo.id,
            photo.url.as_deref(),
        );

        Ok(DownloadedPhoto {
            payload: response.body,
            media_type,
        })
    }
}
