use pagepress_core::ProgressEvent;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed progress frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire shape of one progress frame. Unknown fields (`session_id`, `status`,
/// `pdf_path`, ...) are ignored.
#[derive(Debug, Deserialize)]
struct ProgressFrame {
    #[serde(default)]
    log: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Parse the JSON payload of one SSE `data` event.
///
/// An empty `error` counts as no error, and `error` is only kept on the
/// terminal frame.
pub fn parse_frame(payload: &str) -> Result<ProgressEvent, FrameError> {
    let frame: ProgressFrame = serde_json::from_str(payload)?;
    let failure_reason = frame.error.filter(|reason| !reason.is_empty());
    Ok(ProgressEvent {
        log_line: frame.log,
        completed: frame.completed,
        failure_reason: if frame.completed { failure_reason } else { None },
    })
}
