use conference_config::SessionConfig;
use derive_more::Display;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Display)]
pub enum CallMessage {
    #[display("Join({})", _0.join_code)]
    Join(SessionConfig),
    Leave,
    Close,
    ToggleAudio,
    ToggleVideo,
}

/// Log line meant for a UI, mirrors what went to `tracing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLogMessage {
    pub level: String,
    pub session: String,
    pub message: String,
}

impl CallLogMessage {
    pub fn new(level: impl ToString, session: impl ToString, message: impl ToString) -> Self {
        Self {
            level: level.to_string(),
            session: session.to_string(),
            message: message.to_string(),
        }
    }
}
