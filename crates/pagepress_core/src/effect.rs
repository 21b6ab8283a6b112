use crate::{AttemptId, SessionId};

/// Side effects requested by [`crate::update`], executed in order by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the remote job for `url`; the result comes back tagged with `attempt`.
    Submit { attempt: AttemptId, url: String },
    /// Open the progress channel for a freshly started session.
    OpenChannel { session_id: SessionId },
    /// Tear down the progress channel. Must run before any later message is handled.
    CloseChannel,
    /// Hand the artifact reference to the front end (new browsing context, printout, ...).
    OpenArtifact { artifact_ref: String },
}
