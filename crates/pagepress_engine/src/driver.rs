use std::sync::Arc;

use pagepress_core::{update, AppViewModel, AttemptId, Effect, JobState, Msg, Phase};
use pagepress_logging::{press_debug, press_info, press_warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use url::Url;

use crate::channel::{ChannelProgressSink, ProgressChannel};
use crate::config::{Endpoints, SubmitSettings};
use crate::submit::{ReqwestSubmitter, Submitter};
use crate::{ChannelEvent, ChannelState, SubmitError, Submission};

struct SubmitOutcome {
    attempt: AttemptId,
    result: Result<Submission, SubmitError>,
}

/// Single-owner event loop around [`JobState`].
///
/// All state lives behind `&mut self`; submission and streaming run as spawned
/// tasks that only send results back. Effects are executed in order inside
/// [`JobDriver::dispatch`], so a `CloseChannel` has taken effect before the
/// next event is looked at.
pub struct JobDriver {
    state: JobState,
    channel: ProgressChannel,
    submitter: Arc<dyn Submitter>,
    submit_task: Option<JoinHandle<()>>,
    submit_tx: UnboundedSender<SubmitOutcome>,
    submit_rx: UnboundedReceiver<SubmitOutcome>,
    channel_rx: UnboundedReceiver<ChannelEvent>,
    artifact_requests: Vec<String>,
}

impl JobDriver {
    pub fn new(endpoints: Endpoints, settings: &SubmitSettings) -> Result<Self, SubmitError> {
        let external_base = endpoints.external.clone();
        let submitter = ReqwestSubmitter::new(endpoints, settings)?;
        Ok(Self::with_submitter(Arc::new(submitter), external_base))
    }

    pub fn with_submitter(submitter: Arc<dyn Submitter>, external_base: Url) -> Self {
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(ChannelProgressSink::new(channel_tx));
        Self {
            state: JobState::new(),
            channel: ProgressChannel::new(external_base, sink),
            submitter,
            submit_task: None,
            submit_tx,
            submit_rx,
            channel_rx,
            artifact_requests: Vec::new(),
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn consume_dirty(&mut self) -> bool {
        self.state.consume_dirty()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Nothing more will happen without new input.
    pub fn is_settled(&self) -> bool {
        match self.state.phase() {
            Phase::Succeeded | Phase::Failed => true,
            Phase::Running => self.state.connection_lost(),
            Phase::Idle => !self.state.is_submitting(),
        }
    }

    /// Artifact references requested via [`Msg::DownloadClicked`] since the last call.
    pub fn take_artifact_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.artifact_requests)
    }

    pub fn submit(&mut self, url: impl Into<String>) {
        self.dispatch(Msg::SubmitRequested { url: url.into() });
    }

    pub fn reset(&mut self) {
        self.dispatch(Msg::ResetClicked);
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Wait for the next submission result or channel event and apply it.
    ///
    /// Must be called from within a tokio runtime. Waits forever while idle.
    pub async fn next(&mut self) {
        tokio::select! {
            Some(outcome) = self.submit_rx.recv() => self.handle_submit(outcome),
            Some(event) = self.channel_rx.recv() => self.handle_channel(event),
        }
    }

    /// Submit `url` and drive the job until it settles.
    pub async fn run(&mut self, url: impl Into<String>) -> AppViewModel {
        self.submit(url);
        while !self.is_settled() {
            self.next().await;
        }
        self.view()
    }

    /// Close the channel and drop any in-flight submission.
    pub fn shutdown(&mut self) {
        self.channel.close();
        if let Some(task) = self.submit_task.take() {
            task.abort();
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Submit { attempt, url } => {
                press_info!("attempt={} submitting {}", attempt, url);
                let submitter = self.submitter.clone();
                let tx = self.submit_tx.clone();
                let task = tokio::spawn(async move {
                    let result = submitter.submit(&url).await;
                    let _ = tx.send(SubmitOutcome { attempt, result });
                });
                if let Some(previous) = self.submit_task.replace(task) {
                    previous.abort();
                }
            }
            Effect::OpenChannel { session_id } => {
                self.channel.open(session_id);
            }
            Effect::CloseChannel => self.channel.close(),
            Effect::OpenArtifact { artifact_ref } => {
                press_info!("artifact requested {}", artifact_ref);
                self.artifact_requests.push(artifact_ref);
            }
        }
    }

    fn handle_submit(&mut self, outcome: SubmitOutcome) {
        let SubmitOutcome { attempt, result } = outcome;
        let msg = match result {
            Ok(submission) => {
                press_info!(
                    "attempt={} session={} accepted: {}",
                    attempt,
                    submission.session_id,
                    submission.message
                );
                Msg::SubmitSucceeded {
                    attempt,
                    session_id: submission.session_id,
                    message: submission.message,
                    artifact_ref: submission.artifact_ref,
                }
            }
            Err(err) => {
                press_warn!("attempt={} submission failed ({}): {}", attempt, err.kind, err);
                Msg::SubmitFailed {
                    attempt,
                    message: err.message,
                }
            }
        };
        self.dispatch(msg);
    }

    fn handle_channel(&mut self, event: ChannelEvent) {
        let Some(event) = self.channel.accept(event) else {
            return;
        };
        match event {
            ChannelEvent::Connected {
                session_id,
                generation,
            } => {
                press_debug!(
                    "session={} generation={} progress channel connected",
                    session_id,
                    generation
                );
            }
            ChannelEvent::Progress {
                session_id, event, ..
            } => self.dispatch(Msg::Progress { session_id, event }),
            ChannelEvent::TransportError {
                session_id, reason, ..
            } => self.dispatch(Msg::ChannelLost { session_id, reason }),
        }
    }
}

impl Drop for JobDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
