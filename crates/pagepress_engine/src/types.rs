use std::fmt;

use pagepress_core::{ProgressEvent, SessionId};

/// Number of the subscription an event was produced by. Strictly increasing per channel.
pub type Generation = u64;

/// Result of a successful start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub session_id: SessionId,
    pub message: String,
    /// Absolute, client-resolvable reference to the produced document.
    pub artifact_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SubmitError {
    pub kind: SubmitFailureKind,
    /// Human-readable message, shown to the user as is.
    pub message: String,
}

impl SubmitError {
    pub(crate) fn new(kind: SubmitFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailureKind {
    HttpStatus(u16),
    MalformedResponse,
    Timeout,
    Network,
    Config,
}

impl fmt::Display for SubmitFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            SubmitFailureKind::MalformedResponse => write!(f, "malformed response"),
            SubmitFailureKind::Timeout => write!(f, "timeout"),
            SubmitFailureKind::Network => write!(f, "network error"),
            SubmitFailureKind::Config => write!(f, "configuration error"),
        }
    }
}

/// Raw event produced by a streaming task, tagged with its subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The stream answered with a success status. Informational only.
    Connected {
        session_id: SessionId,
        generation: Generation,
    },
    Progress {
        session_id: SessionId,
        generation: Generation,
        event: ProgressEvent,
    },
    /// The stream failed or ended without a terminal frame.
    TransportError {
        session_id: SessionId,
        generation: Generation,
        reason: String,
    },
}

impl ChannelEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            ChannelEvent::Connected { session_id, .. }
            | ChannelEvent::Progress { session_id, .. }
            | ChannelEvent::TransportError { session_id, .. } => session_id,
        }
    }

    pub fn generation(&self) -> Generation {
        match self {
            ChannelEvent::Connected { generation, .. }
            | ChannelEvent::Progress { generation, .. }
            | ChannelEvent::TransportError { generation, .. } => *generation,
        }
    }

    /// True for the frame that ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelEvent::Progress { event, .. } if event.is_terminal())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Closed,
    Opening,
    Streaming,
}
