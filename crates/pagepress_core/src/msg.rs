use crate::{AttemptId, ProgressEvent, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked to convert `url` (already validated as an absolute URL).
    SubmitRequested { url: String },
    /// The remote engine accepted the job.
    SubmitSucceeded {
        attempt: AttemptId,
        session_id: SessionId,
        message: String,
        artifact_ref: String,
    },
    /// The start request failed; `message` is shown to the user verbatim.
    SubmitFailed { attempt: AttemptId, message: String },
    /// One parsed frame from the progress channel.
    Progress {
        session_id: SessionId,
        event: ProgressEvent,
    },
    /// The progress channel dropped without a terminal frame.
    ChannelLost { session_id: SessionId, reason: String },
    /// User clicked reset / retry, or the owning context is going away.
    ResetClicked,
    /// User clicked download.
    DownloadClicked,
    /// Render tick to coalesce redraws.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
