use crate::{Phase, SessionId};

/// Snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub source_url: Option<String>,
    pub session_id: Option<SessionId>,
    pub artifact_ref: Option<String>,
    pub log: Vec<String>,
    pub error: Option<String>,
    /// A start request is in flight.
    pub submitting: bool,
    /// The progress channel dropped; the phase was left untouched.
    pub connection_lost: bool,
    pub dirty: bool,
}

impl AppViewModel {
    /// Download link, only once the job has succeeded.
    pub fn download_link(&self) -> Option<&str> {
        match self.phase {
            Phase::Succeeded => self.artifact_ref.as_deref(),
            _ => None,
        }
    }
}
