use std::sync::Arc;

use futures_util::StreamExt;
use pagepress_core::SessionId;
use pagepress_logging::{press_debug, press_info, press_trace, press_warn};
use reqwest::header::ACCEPT;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::frame::parse_frame;
use crate::resolve::progress_stream_url;
use crate::sse::SseDecoder;
use crate::{ChannelEvent, ChannelState, Generation};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ChannelEvent);
}

pub struct ChannelProgressSink {
    tx: UnboundedSender<ChannelEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: UnboundedSender<ChannelEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ChannelEvent) {
        let _ = self.tx.send(event);
    }
}

/// The one live subscription. Dropping it stops the streaming task.
struct Subscription {
    session_id: SessionId,
    generation: Generation,
    state: ChannelState,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
        press_info!(
            "session={} generation={} progress channel closed",
            self.session_id,
            self.generation
        );
    }
}

/// Owns at most one progress subscription at a time.
///
/// Streaming tasks only emit [`ChannelEvent`]s into the sink; every event must
/// pass through [`ProgressChannel::accept`] before it is applied to job state.
/// That gate drops events of superseded subscriptions and anything after the
/// terminal frame, and releases the subscription once it is finished.
pub struct ProgressChannel {
    external_base: Url,
    client: reqwest::Client,
    sink: Arc<dyn ProgressSink>,
    next_generation: Generation,
    active: Option<Subscription>,
}

impl ProgressChannel {
    pub fn new(external_base: Url, sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_client(external_base, reqwest::Client::new(), sink)
    }

    /// The client must not carry a request timeout: streams stay open for the whole job.
    pub fn with_client(
        external_base: Url,
        client: reqwest::Client,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            external_base,
            client,
            sink,
            next_generation: 0,
            active: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.active
            .as_ref()
            .map_or(ChannelState::Closed, |active| active.state)
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.active.as_ref().map(|active| &active.session_id)
    }

    pub fn generation(&self) -> Option<Generation> {
        self.active.as_ref().map(|active| active.generation)
    }

    /// Subscribe to `session_id`, closing whatever was open before.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&mut self, session_id: SessionId) -> Generation {
        self.close();

        self.next_generation += 1;
        let generation = self.next_generation;
        let url = progress_stream_url(&self.external_base, &session_id);
        let cancel = CancellationToken::new();

        press_info!(
            "session={} generation={} opening progress channel {}",
            session_id,
            generation,
            url
        );

        let task = tokio::spawn(stream_session(
            self.client.clone(),
            url,
            session_id.clone(),
            generation,
            self.sink.clone(),
            cancel.clone(),
        ));

        self.active = Some(Subscription {
            session_id,
            generation,
            state: ChannelState::Opening,
            cancel,
            task,
        });
        generation
    }

    /// Idempotent; closing a closed or never opened channel does nothing.
    pub fn close(&mut self) {
        self.active = None;
    }

    /// Gate an event from a streaming task. Returns it when it belongs to the
    /// live subscription, and closes the subscription on terminal or transport events.
    pub fn accept(&mut self, event: ChannelEvent) -> Option<ChannelEvent> {
        let Some(active) = self.active.as_mut() else {
            press_trace!(
                "session={} generation={} dropping event, channel closed",
                event.session_id(),
                event.generation()
            );
            return None;
        };
        if active.generation != event.generation() {
            press_debug!(
                "session={} generation={} dropping stale event (live generation={})",
                event.session_id(),
                event.generation(),
                active.generation
            );
            return None;
        }

        match &event {
            ChannelEvent::Connected { .. } => {
                active.state = ChannelState::Streaming;
            }
            ChannelEvent::Progress { .. } if event.is_terminal() => {
                self.close();
            }
            ChannelEvent::Progress { .. } => {}
            ChannelEvent::TransportError { reason, .. } => {
                press_warn!(
                    "session={} generation={} progress channel lost: {}",
                    event.session_id(),
                    event.generation(),
                    reason
                );
                self.close();
            }
        }
        Some(event)
    }
}

async fn stream_session(
    client: reqwest::Client,
    url: Url,
    session_id: SessionId,
    generation: Generation,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {
            press_debug!("session={} generation={} streaming task cancelled", session_id, generation);
        }
        reason = pump(&client, url, &session_id, generation, sink.as_ref()) => {
            if let Some(reason) = reason {
                sink.emit(ChannelEvent::TransportError {
                    session_id: session_id.clone(),
                    generation,
                    reason,
                });
            }
        }
    }
}

/// Reads the stream until the terminal frame (`None`) or a transport failure (`Some(reason)`).
async fn pump(
    client: &reqwest::Client,
    url: Url,
    session_id: &SessionId,
    generation: Generation,
    sink: &dyn ProgressSink,
) -> Option<String> {
    let response = match client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => return Some(err.to_string()),
    };
    let status = response.status();
    if !status.is_success() {
        return Some(format!("http status {}", status.as_u16()));
    }

    sink.emit(ChannelEvent::Connected {
        session_id: session_id.clone(),
        generation,
    });

    let mut decoder = SseDecoder::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => return Some(err.to_string()),
        };
        let payloads = match decoder.feed(&chunk) {
            Ok(payloads) => payloads,
            Err(err) => return Some(err.to_string()),
        };
        for payload in payloads {
            match parse_frame(&payload) {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    sink.emit(ChannelEvent::Progress {
                        session_id: session_id.clone(),
                        generation,
                        event,
                    });
                    // Anything the transport buffered after this is not looked at.
                    if terminal {
                        press_debug!(
                            "session={} generation={} terminal frame received",
                            session_id,
                            generation
                        );
                        return None;
                    }
                }
                Err(err) => {
                    press_warn!(
                        "session={} generation={} {} (payload={:?})",
                        session_id,
                        generation,
                        err,
                        payload
                    );
                }
            }
        }
    }

    Some("stream ended before completion".to_string())
}
