//! Media type detection for downloaded payloads

pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Pick a media type from the response header, then the id, then the URL
/// path. Generic octet-stream headers (common on object stores) are ignored
/// in favour of the extension.
pub fn detect_media_type(content_type: Option<&str>, id: &str, url: Option<&str>) -> String {
    if let Some(header) = content_type {
        let essence = header
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !essence.is_empty() && !is_generic(&essence) {
            return essence;
        }
    }

    from_extension(id)
        .or_else(|| url.map(strip_query).and_then(from_extension))
        .unwrap_or(FALLBACK_MEDIA_TYPE)
        .to_string()
}

fn is_generic(essence: &str) -> bool {
    matches!(essence, "application/octet-stream" | "binary/octet-stream")
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn from_extension(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
