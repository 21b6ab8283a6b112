//! Pagepress engine: job submission, progress streaming and effect execution.
mod channel;
mod config;
mod driver;
mod frame;
mod resolve;
mod sse;
mod submit;
mod types;

pub use channel::{ChannelProgressSink, ProgressChannel, ProgressSink};
pub use config::{ConfigError, EngineConfig, Endpoints, SubmitSettings};
pub use driver::JobDriver;
pub use frame::{parse_frame, FrameError};
pub use resolve::{progress_stream_url, resolve_artifact_ref};
pub use sse::{LineTooLong, SseDecoder, MAX_LINE_BYTES};
pub use submit::{ReqwestSubmitter, Submitter};
pub use types::{
    ChannelEvent, ChannelState, Generation, SubmitError, SubmitFailureKind, Submission,
};
