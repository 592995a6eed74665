//! Manifest retrieval over HTTP

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{
    http::{HttpClient, HttpRequest},
    time::Clock,
};
use core_runtime::logging::redact_url;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{ManifestError, Result};
use crate::model::Manifest;
use crate::normalize::parse_manifest;

/// Fetches and normalizes the remote manifest.
pub struct ManifestClient {
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    cache_bust: bool,
    timeout: Option<Duration>,
}

impl ManifestClient {
    pub fn new(http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            clock,
            cache_bust: true,
            timeout: None,
        }
    }

    /// Append `_=<unix millis>` to every request (on by default)
    pub fn with_cache_bust(mut self, enabled: bool) -> Self {
        self.cache_bust = enabled;
        self
    }

    /// Per-request timeout; the transport default applies when unset
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fetch `url` and normalize the body.
    ///
    /// # Errors
    ///
    /// - `ManifestError::Fetch` on transport failure, a non-2xx status or,
    ///   with cache busting on, a URL that does not parse
    /// - `ManifestError::Parse` when the body is not a usable manifest
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    pub async fn fetch(&self, url: &str) -> Result<Manifest> {
        let request_url = if self.cache_bust {
            cache_busted_url(url, self.clock.unix_timestamp_millis())?
        } else {
            url.to_string()
        };

        let mut request = HttpRequest::get(request_url)
            .header("Accept", "application/json")
            .header("Cache-Control", "no-cache");
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(error = %e, "Manifest request failed");
            ManifestError::fetch(e.to_string())
        })?;

        if !response.is_success() {
            warn!(status = response.status, "Manifest request returned error status");
            return Err(ManifestError::Fetch {
                message: format!("HTTP {}", response.status),
                status: Some(response.status),
            });
        }

        debug!(bytes = response.body.len(), "Received manifest body");
        let manifest = parse_manifest(&response.body)?;

        info!(
            version = %manifest.version,
            photos = manifest.len(),
            mode = manifest.mode.as_str(),
            "Fetched manifest"
        );
        Ok(manifest)
    }
}

/// Set the cache-busting `_=<millis>` query parameter. An existing `_` pair
/// is replaced; the rest of the query is left as it was.
pub fn cache_busted_url(url: &str, unix_millis: i64) -> Result<String> {
    let mut parsed = Url::parse(url)
        .map_err(|e| ManifestError::fetch(format!("Invalid manifest URL: {}", e)))?;

    if parsed.query_pairs().any(|(key, _)| key == "_") {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| key != "_")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        parsed.set_query(None);
        if !kept.is_empty() {
            parsed.query_pairs_mut().extend_pairs(kept.iter());
        }
    }

    parsed
        .query_pairs_mut()
        .append_pair("_", &unix_millis.to_string());
    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bridge_traits::time::ManualClock;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::from_millis(1_700_000_000_123))
    }

    #[test]
    fn test_cache_busted_url() {
        let bust = |url| cache_busted_url(url, 42).unwrap();

        assert_eq!(bust("https://cdn/manifest.json"), "https://cdn/manifest.json?_=42");
        assert_eq!(
            bust("https://cdn/manifest.json?sig=abc"),
            "https://cdn/manifest.json?sig=abc&_=42"
        );
        assert_eq!(bust("https://cdn/manifest.json?"), "https://cdn/manifest.json?_=42");
        assert_eq!(
            bust("https://cdn/manifest.json#top"),
            "https://cdn/manifest.json?_=42#top"
        );
    }

    #[test]
    fn test_cache_busted_url_replaces_previous_token() {
        assert_eq!(
            cache_busted_url("https://cdn/m.json?_=old", 42).unwrap(),
            "https://cdn/m.json?_=42"
        );
        assert_eq!(
            cache_busted_url("https://cdn/m.json?_=old&sig=abc", 42).unwrap(),
            "https://cdn/m.json?sig=abc&_=42"
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_unparseable_url() {
        // No expectations: the request must never be sent
        let http = MockHttpClient::new();
        let client = ManifestClient::new(Arc::new(http), clock());

        let err = client.fetch("not a url").await.unwrap_err();
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_fetch_appends_cache_bust_and_parses() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url == "https://cdn/manifest.json?_=1700000000123")
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"version":"v2","photos":[{"id":"a","url":"https://cdn/a"}]}"#,
                ))
            });

        let client = ManifestClient::new(Arc::new(http), clock());
        let manifest = client.fetch("https://cdn/manifest.json").await.unwrap();

        assert_eq!(manifest.version, "v2");
        assert_eq!(manifest.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_without_cache_bust() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url == "https://cdn/manifest.json")
            .returning(|_| Ok(response(200, r#"{"images":["a"]}"#)));

        let client = ManifestClient::new(Arc::new(http), clock()).with_cache_bust(false);
        let manifest = client.fetch("https://cdn/manifest.json").await.unwrap();
        assert!(!manifest.photos[0].is_downloadable());
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(404, "not found")));

        let client = ManifestClient::new(Arc::new(http), clock());
        let err = client.fetch("https://cdn/manifest.json").await.unwrap_err();

        assert!(matches!(
            err,
            ManifestError::Fetch {
                status: Some(404),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_transport_error_is_fetch_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(|_| {
            Err(BridgeError::OperationFailed(
                "Connection failed".to_string(),
            ))
        });

        let client = ManifestClient::new(Arc::new(http), clock());
        let err = client.fetch("https://cdn/manifest.json").await.unwrap_err();
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_bad_body_is_parse_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(200, "<html>captive portal</html>")));

        let client = ManifestClient::new(Arc::new(http), clock());
        let err = client.fetch("https://cdn/manifest.json").await.unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }
}
