use crate::{Effect, JobSession, JobState, Msg, Phase};

/// Pure update function: applies a message to state and returns any effects.
///
/// Effects must be executed in the returned order; `CloseChannel` always comes
/// before anything that could open a new channel.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::SubmitRequested { url } => {
            let mut effects = Vec::with_capacity(2);
            // A new job supersedes the current one; its channel goes first.
            if state.has_activity() {
                state.reset();
                effects.push(Effect::CloseChannel);
            }
            let attempt = state.begin_submit(url.clone());
            effects.push(Effect::Submit { attempt, url });
            effects
        }
        Msg::SubmitSucceeded {
            attempt,
            session_id,
            message: _,
            artifact_ref,
        } => {
            if state.phase() != Phase::Idle {
                return (state, Vec::new());
            }
            match state.take_pending(attempt) {
                Some(source_url) => {
                    state.start_session(JobSession {
                        session_id: session_id.clone(),
                        source_url,
                        artifact_ref: Some(artifact_ref),
                    });
                    vec![Effect::OpenChannel { session_id }]
                }
                None => Vec::new(),
            }
        }
        Msg::SubmitFailed { attempt, message } => {
            if state.phase() == Phase::Idle && state.take_pending(attempt).is_some() {
                state.fail_submit(message);
            }
            Vec::new()
        }
        Msg::Progress { session_id, event } => {
            if state.phase() == Phase::Running && state.is_current(&session_id) {
                state.apply_progress(event);
            }
            Vec::new()
        }
        Msg::ChannelLost {
            session_id,
            reason: _,
        } => {
            // Not a job failure: the remote job may still be running.
            if state.phase() == Phase::Running && state.is_current(&session_id) {
                state.mark_connection_lost();
            }
            Vec::new()
        }
        Msg::ResetClicked => {
            if state.has_activity() {
                state.reset();
                vec![Effect::CloseChannel]
            } else {
                Vec::new()
            }
        }
        Msg::DownloadClicked => match (state.phase(), state.session()) {
            (Phase::Succeeded, Some(session)) => session
                .artifact_ref
                .clone()
                .map(|artifact_ref| vec![Effect::OpenArtifact { artifact_ref }])
                .unwrap_or_default(),
            _ => Vec::new(),
        },
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
