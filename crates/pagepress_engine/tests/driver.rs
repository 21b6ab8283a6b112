use std::time::Duration;

use pagepress_core::{Msg, Phase, START_MARKER};
use pagepress_engine::{ChannelState, EngineConfig, JobDriver, SubmitSettings};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(frames: &[&str]) -> String {
    frames
        .iter()
        .map(|frame| format!("data: {frame}\n\n"))
        .collect()
}

async fn mount_start(server: &MockServer, url: &str, session: &str) {
    Mock::given(method("POST"))
        .and(path("/process-url"))
        .and(body_json(json!({ "url": url })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": session,
            "success": true,
            "message": "job started",
            "download_url": format!("/download/{session}.pdf"),
        })))
        .mount(server)
        .await;
}

async fn mount_stream(server: &MockServer, session: &str, frames: &[&str], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/stream-progress/{session}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_raw(sse_body(frames), "text/event-stream"),
        )
        .mount(server)
        .await;
}

fn driver_for(server: &MockServer) -> JobDriver {
    pagepress_logging::initialize_for_tests();
    let endpoints = EngineConfig::new(server.uri(), server.uri())
        .validate()
        .expect("valid config");
    JobDriver::new(endpoints, &SubmitSettings::default()).expect("driver")
}

async fn drive_until(driver: &mut JobDriver, done: impl Fn(&JobDriver) -> bool) {
    timeout(Duration::from_secs(5), async {
        while !done(driver) {
            driver.next().await;
        }
    })
    .await
    .expect("driver settled in time");
}

#[tokio::test]
async fn job_succeeds_with_ordered_log_and_resolved_download_link() {
    let server = MockServer::start().await;
    mount_start(&server, "https://example.com", "abc123").await;
    mount_stream(
        &server,
        "abc123",
        &[
            r#"{"log":"fetching page"}"#,
            r#"{"log":"rendering"}"#,
            r#"{"completed":true}"#,
        ],
        Duration::ZERO,
    )
    .await;

    let mut driver = driver_for(&server);
    let view = timeout(Duration::from_secs(5), driver.run("https://example.com"))
        .await
        .expect("run finished");

    assert_eq!(view.phase, Phase::Succeeded);
    assert_eq!(
        view.log,
        vec![START_MARKER, "fetching page", "rendering"]
    );
    let expected_link = format!("{}/download/abc123.pdf", server.uri());
    assert_eq!(view.download_link(), Some(expected_link.as_str()));
    assert_eq!(driver.channel_state(), ChannelState::Closed);

    driver.dispatch(Msg::DownloadClicked);
    assert_eq!(driver.take_artifact_requests(), vec![expected_link]);
    assert!(driver.take_artifact_requests().is_empty());
}

#[tokio::test]
async fn reported_failure_ends_job_as_failed() {
    let server = MockServer::start().await;
    mount_start(&server, "https://example.com", "abc123").await;
    mount_stream(
        &server,
        "abc123",
        &[r#"{"completed":true,"error":"render timeout"}"#],
        Duration::ZERO,
    )
    .await;

    let mut driver = driver_for(&server);
    let view = timeout(Duration::from_secs(5), driver.run("https://example.com"))
        .await
        .expect("run finished");

    assert_eq!(view.phase, Phase::Failed);
    assert_eq!(view.error.as_deref(), Some("render timeout"));
    assert_eq!(view.download_link(), None);
    assert_eq!(driver.channel_state(), ChannelState::Closed);
}

#[tokio::test]
async fn failed_submission_never_opens_a_subscription() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process-url"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "detail": "engine unavailable" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut driver = driver_for(&server);
    let view = timeout(Duration::from_secs(5), driver.run("https://example.com"))
        .await
        .expect("run finished");

    assert_eq!(view.phase, Phase::Failed);
    assert_eq!(view.error.as_deref(), Some("engine unavailable"));
    assert_eq!(view.session_id, None);
    assert_eq!(driver.channel_state(), ChannelState::Closed);
}

#[tokio::test]
async fn reset_while_running_closes_channel_and_discards_late_events() {
    let server = MockServer::start().await;
    mount_start(&server, "https://example.com", "abc123").await;
    mount_stream(
        &server,
        "abc123",
        &[r#"{"log":"too late"}"#, r#"{"completed":true,"error":"too late"}"#],
        Duration::from_millis(200),
    )
    .await;

    let mut driver = driver_for(&server);
    driver.submit("https://example.com");
    drive_until(&mut driver, |d| d.state().phase() == Phase::Running).await;
    assert_eq!(driver.channel_state(), ChannelState::Opening);

    driver.reset();

    assert_eq!(driver.channel_state(), ChannelState::Closed);
    let view = driver.view();
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.log.is_empty());
    assert_eq!(view.error, None);
    assert_eq!(view.session_id, None);

    // Nothing from the abandoned session reaches the state.
    let _ = timeout(Duration::from_millis(500), driver.next()).await;
    let view = driver.view();
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.log.is_empty());
    assert!(driver.is_settled());
}

#[tokio::test]
async fn resubmitting_supersedes_the_running_session() {
    let server = MockServer::start().await;
    mount_start(&server, "https://a.example.com", "first").await;
    mount_start(&server, "https://b.example.com", "second").await;
    mount_stream(
        &server,
        "first",
        &[r#"{"log":"from first"}"#, r#"{"completed":true,"error":"stale"}"#],
        Duration::from_millis(300),
    )
    .await;
    mount_stream(
        &server,
        "second",
        &[r#"{"log":"from second"}"#, r#"{"completed":true}"#],
        Duration::ZERO,
    )
    .await;

    let mut driver = driver_for(&server);
    driver.submit("https://a.example.com");
    drive_until(&mut driver, |d| d.state().phase() == Phase::Running).await;

    let view = timeout(Duration::from_secs(5), driver.run("https://b.example.com"))
        .await
        .expect("run finished");

    assert_eq!(view.phase, Phase::Succeeded);
    assert_eq!(view.source_url.as_deref(), Some("https://b.example.com"));
    assert_eq!(view.log, vec![START_MARKER, "from second"]);
    assert_eq!(view.error, None);
}

#[tokio::test]
async fn lost_connection_leaves_job_running() {
    let server = MockServer::start().await;
    mount_start(&server, "https://example.com", "abc123").await;
    mount_stream(
        &server,
        "abc123",
        &[r#"{"log":"fetching page"}"#],
        Duration::ZERO,
    )
    .await;

    let mut driver = driver_for(&server);
    let view = timeout(Duration::from_secs(5), driver.run("https://example.com"))
        .await
        .expect("run finished");

    assert_eq!(view.phase, Phase::Running);
    assert!(view.connection_lost);
    assert_eq!(view.error, None);
    assert_eq!(view.log, vec![START_MARKER, "fetching page"]);
    assert_eq!(driver.channel_state(), ChannelState::Closed);
}

#[tokio::test]
async fn shutdown_while_running_closes_channel_and_delivers_nothing() {
    let server = MockServer::start().await;
    mount_start(&server, "https://example.com", "abc123").await;
    mount_stream(
        &server,
        "abc123",
        &[r#"{"log":"too late"}"#, r#"{"completed":true}"#],
        Duration::from_millis(200),
    )
    .await;

    let mut driver = driver_for(&server);
    driver.submit("https://example.com");
    drive_until(&mut driver, |d| d.state().phase() == Phase::Running).await;

    driver.shutdown();
    assert_eq!(driver.channel_state(), ChannelState::Closed);

    // Keep pumping past the stream's delay; nothing from it may land.
    let _ = timeout(Duration::from_millis(500), async {
        loop {
            driver.next().await;
        }
    })
    .await;
    assert_eq!(driver.channel_state(), ChannelState::Closed);
    let view = driver.view();
    assert_eq!(view.phase, Phase::Running);
    assert_eq!(view.log, vec![START_MARKER]);
}
