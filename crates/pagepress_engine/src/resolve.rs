use pagepress_core::SessionId;
use url::Url;

use crate::config::{parse_base, ConfigError, EXTERNAL_BASE_NAME};

/// Turn a server-relative download path into an absolute reference under `external_base`.
///
/// Base and path are joined with exactly one `/`, keeping any path prefix of the base.
/// A path that already is an absolute http(s) URL is returned unchanged.
pub fn resolve_artifact_ref(external_base: Option<&str>, path: &str) -> Result<String, ConfigError> {
    let base = parse_base(EXTERNAL_BASE_NAME, external_base)?;
    let path = path.trim();
    if is_absolute_http(path) {
        return Ok(path.to_string());
    }
    Ok(format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// `{external_base}/stream-progress/{session_id}`, with the id as one path segment.
pub fn progress_stream_url(external_base: &Url, session_id: &SessionId) -> Url {
    let mut url = external_base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push("stream-progress")
            .push(session_id.as_str());
    }
    url
}

fn is_absolute_http(path: &str) -> bool {
    Url::parse(path)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
