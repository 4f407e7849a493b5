use crate::events::ParticipantId;
use conference_config::LocalUid;
use derive_more::Display;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Default, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Joining,
    /// Joined, no remote peer admitted.
    Active,
    /// Joined with exactly one remote peer admitted.
    SinglePeerLocked,
    Leaving,
}

impl SessionState {
    /// Whether the session holds provider handles.
    pub fn is_live(&self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Leaving)
    }
}

/// UI facing flags. `None` means the flag has not been decided yet in this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFlags {
    pub media_denied: Option<bool>,
    pub remote_left: Option<bool>,
    pub waiting: bool,
    pub ongoing_meeting: Option<bool>,
}

impl Default for NotificationFlags {
    fn default() -> Self {
        Self {
            media_denied: None,
            remote_left: None,
            waiting: true,
            ongoing_meeting: None,
        }
    }
}

impl NotificationFlags {
    /// Flags after a teardown.
    pub fn after_leave() -> Self {
        Self {
            media_denied: Some(false),
            ..Self::default()
        }
    }
}

/// Read only view of a call session for rendering.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub running: bool,
    pub state: SessionState,
    pub flags: NotificationFlags,
    pub admitted: Vec<ParticipantId>,
    pub joined: Option<bool>,
    pub audio_muted: bool,
    pub video_muted: bool,
    pub join_code: String,
    pub display_name: String,
    pub local_uid: Option<LocalUid>,
    pub generation: u64,
    pub last_error: Option<String>,
}
