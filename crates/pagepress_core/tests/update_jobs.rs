use std::sync::Once;

use pagepress_core::{
    update, AttemptId, Effect, JobState, Msg, Phase, ProgressEvent, SessionId, START_MARKER,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pagepress_logging::initialize_for_tests);
}

fn submit(state: JobState, url: &str) -> (JobState, AttemptId) {
    let (state, effects) = update(
        state,
        Msg::SubmitRequested {
            url: url.to_string(),
        },
    );
    let attempt = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Submit { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .expect("submit effect");
    (state, attempt)
}

fn running(session: &str) -> JobState {
    let (state, attempt) = submit(JobState::new(), "https://example.com");
    let (state, _) = update(
        state,
        Msg::SubmitSucceeded {
            attempt,
            session_id: SessionId::from(session),
            message: "started".to_string(),
            artifact_ref: format!("https://api.example.org/download/{session}.pdf"),
        },
    );
    state
}

fn progress(state: JobState, session: &str, event: ProgressEvent) -> JobState {
    let (state, effects) = update(
        state,
        Msg::Progress {
            session_id: SessionId::from(session),
            event,
        },
    );
    assert!(effects.is_empty());
    state
}

#[test]
fn submit_success_starts_running_session_and_opens_channel() {
    init_logging();
    let (mut state, attempt) = submit(JobState::new(), "https://example.com");
    assert_eq!(state.phase(), Phase::Idle);
    assert!(state.is_submitting());
    assert!(state.consume_dirty());

    let (mut state, effects) = update(
        state,
        Msg::SubmitSucceeded {
            attempt,
            session_id: SessionId::from("abc123"),
            message: "started".to_string(),
            artifact_ref: "https://api.example.org/download/abc123.pdf".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::OpenChannel {
            session_id: SessionId::from("abc123")
        }]
    );
    assert_eq!(state.phase(), Phase::Running);
    assert_eq!(state.log(), [START_MARKER.to_string()]);
    assert!(!state.is_submitting());
    let session = state.session().expect("session");
    assert_eq!(session.source_url, "https://example.com");
    assert!(state.consume_dirty());
}

#[test]
fn log_lines_are_appended_in_arrival_order_until_success() {
    init_logging();
    let state = running("abc123");
    let state = progress(state, "abc123", ProgressEvent::log("fetching page"));
    let state = progress(state, "abc123", ProgressEvent::log("rendering"));
    let state = progress(state, "abc123", ProgressEvent::succeeded());

    assert_eq!(state.phase(), Phase::Succeeded);
    assert_eq!(
        state.log(),
        [START_MARKER, "fetching page", "rendering"].map(String::from)
    );
    assert_eq!(state.error(), None);
}

#[test]
fn duplicate_log_lines_are_kept() {
    init_logging();
    let state = running("abc123");
    let state = progress(state, "abc123", ProgressEvent::log("scrolling"));
    let state = progress(state, "abc123", ProgressEvent::log("scrolling"));

    assert_eq!(&state.log()[1..], ["scrolling", "scrolling"].map(String::from));
}

#[test]
fn completed_with_reason_fails_job() {
    init_logging();
    let state = running("abc123");
    let state = progress(state, "abc123", ProgressEvent::failed("render timeout"));

    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(state.error(), Some("render timeout"));
    assert_eq!(state.view().download_link(), None);
}

#[test]
fn terminal_event_log_line_is_kept() {
    init_logging();
    let state = running("abc123");
    let state = progress(
        state,
        "abc123",
        ProgressEvent::succeeded().with_log("PDF generated"),
    );

    assert_eq!(state.phase(), Phase::Succeeded);
    assert_eq!(state.log().last().map(String::as_str), Some("PDF generated"));
}

#[test]
fn events_after_terminal_do_not_mutate_state() {
    init_logging();
    let state = running("abc123");
    let mut state = progress(state, "abc123", ProgressEvent::succeeded());
    assert!(state.consume_dirty());
    let before = state.clone();

    let state = progress(state, "abc123", ProgressEvent::log("late line"));
    let mut state = progress(state, "abc123", ProgressEvent::failed("late failure"));

    assert_eq!(state, before);
    assert_eq!(state.phase(), Phase::Succeeded);
    assert!(!state.consume_dirty());
}

#[test]
fn submit_failure_fails_without_session() {
    init_logging();
    let (state, attempt) = submit(JobState::new(), "https://example.com");
    let (state, effects) = update(
        state,
        Msg::SubmitFailed {
            attempt,
            message: "engine unavailable".to_string(),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(state.error(), Some("engine unavailable"));
    assert_eq!(state.session(), None);
    assert!(state.log().is_empty());
}

#[test]
fn reset_while_running_closes_channel_and_clears_everything() {
    init_logging();
    let state = running("abc123");
    let state = progress(state, "abc123", ProgressEvent::log("fetching page"));

    let (state, effects) = update(state, Msg::ResetClicked);

    assert_eq!(effects, vec![Effect::CloseChannel]);
    assert_eq!(state.phase(), Phase::Idle);
    assert!(state.log().is_empty());
    assert_eq!(state.error(), None);
    assert_eq!(state.session_id(), None);

    // A frame from the abandoned session arriving late is discarded.
    let state = progress(state, "abc123", ProgressEvent::failed("too late"));
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.error(), None);
}

#[test]
fn reset_after_failure_returns_to_idle() {
    init_logging();
    let (state, attempt) = submit(JobState::new(), "https://example.com");
    let (state, _) = update(
        state,
        Msg::SubmitFailed {
            attempt,
            message: "boom".to_string(),
        },
    );
    let (state, effects) = update(state, Msg::ResetClicked);

    assert_eq!(effects, vec![Effect::CloseChannel]);
    assert_eq!(state.view().error, None);
    assert_eq!(state.phase(), Phase::Idle);
}

#[test]
fn reset_when_idle_is_noop() {
    init_logging();
    let state = JobState::new();
    let (next, effects) = update(state.clone(), Msg::ResetClicked);

    assert!(effects.is_empty());
    assert_eq!(next, state);
}

#[test]
fn channel_lost_keeps_running_phase() {
    init_logging();
    let state = running("abc123");
    let (state, effects) = update(
        state,
        Msg::ChannelLost {
            session_id: SessionId::from("abc123"),
            reason: "connection reset".to_string(),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Running);
    assert!(state.connection_lost());
    assert_eq!(state.error(), None);
}
