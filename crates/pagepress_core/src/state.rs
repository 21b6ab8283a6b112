use crate::view_model::AppViewModel;
use crate::{AttemptId, JobSession, ProgressEvent, SessionId};

/// First line of every session log.
pub const START_MARKER: &str = "Starting conversion...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSubmit {
    attempt: AttemptId,
    url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobState {
    phase: Phase,
    log: Vec<String>,
    error: Option<String>,
    session: Option<JobSession>,
    pending: Option<PendingSubmit>,
    next_attempt: AttemptId,
    connection_lost: bool,
    dirty: bool,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session(&self) -> Option<&JobSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref().map(|session| &session.session_id)
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn connection_lost(&self) -> bool {
        self.connection_lost
    }

    /// True when there is anything for a channel to be open for, or to tear down.
    pub fn has_activity(&self) -> bool {
        self.session.is_some() || self.pending.is_some() || self.phase != Phase::Idle
    }

    pub fn view(&self) -> AppViewModel {
        let session = self.session.as_ref();
        AppViewModel {
            phase: self.phase,
            source_url: session
                .map(|s| s.source_url.clone())
                .or_else(|| self.pending.as_ref().map(|p| p.url.clone())),
            session_id: session.map(|s| s.session_id.clone()),
            artifact_ref: session.and_then(|s| s.artifact_ref.clone()),
            log: self.log.clone(),
            error: self.error.clone(),
            submitting: self.pending.is_some(),
            connection_lost: self.connection_lost,
            dirty: self.dirty,
        }
    }

    /// Returns the dirty flag and clears it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn begin_submit(&mut self, url: String) -> AttemptId {
        self.next_attempt += 1;
        let attempt = self.next_attempt;
        self.pending = Some(PendingSubmit { attempt, url });
        self.mark_dirty();
        attempt
    }

    /// Takes the pending url when `attempt` is the one in flight.
    pub(crate) fn take_pending(&mut self, attempt: AttemptId) -> Option<String> {
        match &self.pending {
            Some(pending) if pending.attempt == attempt => {
                self.pending.take().map(|pending| pending.url)
            }
            _ => None,
        }
    }

    pub(crate) fn start_session(&mut self, session: JobSession) {
        self.phase = Phase::Running;
        self.session = Some(session);
        self.log = vec![START_MARKER.to_string()];
        self.error = None;
        self.connection_lost = false;
        self.mark_dirty();
    }

    pub(crate) fn fail_submit(&mut self, message: String) {
        self.phase = Phase::Failed;
        self.error = Some(message);
        self.mark_dirty();
    }

    pub(crate) fn is_current(&self, session_id: &SessionId) -> bool {
        self.session_id() == Some(session_id)
    }

    pub(crate) fn apply_progress(&mut self, event: ProgressEvent) {
        if let Some(line) = event.log_line {
            self.log.push(line);
            self.mark_dirty();
        }
        if event.completed {
            match event.failure_reason {
                Some(reason) => {
                    self.phase = Phase::Failed;
                    self.error = Some(reason);
                }
                None => self.phase = Phase::Succeeded,
            }
            self.mark_dirty();
        }
    }

    pub(crate) fn mark_connection_lost(&mut self) {
        if !self.connection_lost {
            self.connection_lost = true;
            self.mark_dirty();
        }
    }

    /// Back to `Idle`. The attempt counter survives so late results stay stale.
    pub(crate) fn reset(&mut self) {
        let next_attempt = self.next_attempt;
        *self = Self {
            next_attempt,
            dirty: true,
            ..Self::default()
        };
    }
}
