use std::fmt;

/// Monotonic id of one submission attempt, used to drop late results.
pub type AttemptId = u64;

/// Server-issued correlation key for one conversion job. Never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The job that is currently tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSession {
    pub session_id: SessionId,
    pub source_url: String,
    pub artifact_ref: Option<String>,
}

/// One unit of the progress stream, already decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressEvent {
    pub log_line: Option<String>,
    pub completed: bool,
    /// Only meaningful when `completed` is set.
    pub failure_reason: Option<String>,
}

impl ProgressEvent {
    pub fn log(line: impl Into<String>) -> Self {
        Self {
            log_line: Some(line.into()),
            ..Self::default()
        }
    }

    pub fn succeeded() -> Self {
        Self {
            completed: true,
            ..Self::default()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            completed: true,
            failure_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.log_line = Some(line.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.completed
    }
}
