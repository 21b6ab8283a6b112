use pagepress_core::SessionId;
use pagepress_logging::{press_debug, press_info};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{Endpoints, SubmitSettings};
use crate::resolve::resolve_artifact_ref;
use crate::{SubmitError, SubmitFailureKind, Submission};

const START_PATH: &str = "process-url";

/// Starts one remote conversion job. Never opens the progress channel.
#[async_trait::async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, source_url: &str) -> Result<Submission, SubmitError>;
}

#[derive(Serialize)]
struct StartRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct StartResponse {
    session_id: String,
    #[serde(default)]
    message: String,
    download_url: String,
}

/// Submits to the engine's internal address and rewrites the returned
/// download path against the external base, like the forwarding proxy does.
#[derive(Debug, Clone)]
pub struct ReqwestSubmitter {
    endpoints: Endpoints,
    client: reqwest::Client,
}

impl ReqwestSubmitter {
    pub fn new(endpoints: Endpoints, settings: &SubmitSettings) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SubmitError::new(SubmitFailureKind::Network, err.to_string()))?;
        Ok(Self { endpoints, client })
    }

    fn start_url(&self) -> Url {
        let mut url = self.endpoints.internal.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(START_PATH);
        }
        url
    }
}

#[async_trait::async_trait]
impl Submitter for ReqwestSubmitter {
    async fn submit(&self, source_url: &str) -> Result<Submission, SubmitError> {
        let start_url = self.start_url();
        press_debug!("POST {} url={}", start_url, source_url);

        let response = self
            .client
            .post(start_url)
            .json(&StartRequest { url: source_url })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(SubmitError::new(
                SubmitFailureKind::HttpStatus(status.as_u16()),
                failure_message(status.as_u16(), &body),
            ));
        }

        let started: StartResponse = serde_json::from_slice(&body).map_err(|err| {
            SubmitError::new(
                SubmitFailureKind::MalformedResponse,
                format!("malformed response from conversion service: {err}"),
            )
        })?;

        let artifact_ref = resolve_artifact_ref(
            Some(self.endpoints.external.as_str()),
            &started.download_url,
        )
        .map_err(|err| SubmitError::new(SubmitFailureKind::Config, err.to_string()))?;

        press_info!(
            "session={} started message={:?} artifact={}",
            started.session_id,
            started.message,
            artifact_ref
        );
        Ok(Submission {
            session_id: SessionId::from(started.session_id),
            message: started.message,
            artifact_ref,
        })
    }
}

/// `detail` from a `{ "detail": "..." }` body, or a generic message.
fn failure_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| format!("conversion service error: status {status}"))
}

fn map_reqwest_error(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        return SubmitError::new(SubmitFailureKind::Timeout, err.to_string());
    }
    SubmitError::new(SubmitFailureKind::Network, err.to_string())
}
