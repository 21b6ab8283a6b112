//! Pagepress core: pure job state machine and view-model helpers.
mod effect;
mod msg;
mod session;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use session::{AttemptId, JobSession, ProgressEvent, SessionId};
pub use state::{JobState, Phase, START_MARKER};
pub use update::update;
pub use view_model::AppViewModel;
