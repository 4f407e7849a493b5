use conference_config::LocalUid;
use derive_more::Display;
use serde::{
    Deserialize,
    Serialize,
};

/// Reason string the provider reports when the signaling key has expired.
pub const DYNAMIC_KEY_TIMEOUT: &str = "DYNAMIC_KEY_TIMEOUT";

/// Peer handle as the provider hands it out, either numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerHandle {
    Numeric(u64),
    Text(String),
}

/// Identifies a subscribed remote stream for as long as it stays subscribed.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "PeerHandle", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Element the remote stream is rendered into.
    pub fn element_id(&self) -> String {
        format!("id: {}", self.0)
    }
}

impl From<PeerHandle> for ParticipantId {
    fn from(handle: PeerHandle) -> Self {
        match handle {
            PeerHandle::Numeric(id) => Self(id.to_string()),
            PeerHandle::Text(id) => Self(id),
        }
    }
}

impl From<u64> for ParticipantId {
    fn from(id: u64) -> Self {
        PeerHandle::Numeric(id).into()
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        PeerHandle::Text(id.to_string()).into()
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPermission {
    #[display("granted")]
    Granted,
    #[display("denied")]
    Denied,
}

#[derive(Debug, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderErrorKind {
    /// The signaling key expired, renewing it keeps the session alive.
    #[display("DYNAMIC_KEY_TIMEOUT")]
    DynamicKeyTimeout,
    #[display("{_0}")]
    Other(String),
}

impl ProviderErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderErrorKind::DynamicKeyTimeout)
    }
}

impl From<String> for ProviderErrorKind {
    fn from(reason: String) -> Self {
        if reason == DYNAMIC_KEY_TIMEOUT {
            ProviderErrorKind::DynamicKeyTimeout
        } else {
            ProviderErrorKind::Other(reason)
        }
    }
}

impl From<&str> for ProviderErrorKind {
    fn from(reason: &str) -> Self {
        reason.to_string().into()
    }
}

impl From<ProviderErrorKind> for String {
    fn from(kind: ProviderErrorKind) -> Self {
        kind.to_string()
    }
}

/// Everything the media provider reports back through its registered handlers.
#[derive(Debug, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProviderEvent {
    /// The local media handle finished initialising.
    #[display("LocalMediaReady")]
    LocalMediaReady,
    /// The provider accepted the join request.
    #[display("RoomJoined({uid})")]
    RoomJoined { uid: LocalUid },
    #[display("MediaAccess({permission})")]
    MediaAccess { permission: MediaPermission },
    #[display("PeerLeft({peer})")]
    PeerLeft { peer: ParticipantId },
    #[display("RemoteStreamAdded({peer})")]
    RemoteStreamAdded { peer: ParticipantId },
    #[display("RemoteStreamSubscribed({peer})")]
    RemoteStreamSubscribed { peer: ParticipantId },
    #[display("RemoteStreamRemoved({peer})")]
    RemoteStreamRemoved { peer: ParticipantId },
    #[display("Error({kind})")]
    Error { kind: ProviderErrorKind },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numeric_and_text_handles_become_ids() {
        assert_eq!(ParticipantId::from(7u64), ParticipantId::from("7"));
        assert_eq!(ParticipantId::from(7u64).element_id(), "id: 7");
    }

    #[test]
    fn error_reasons_are_classified() {
        assert!(ProviderErrorKind::from("DYNAMIC_KEY_TIMEOUT").is_transient());
        let other = ProviderErrorKind::from("INVALID_CHANNEL");
        assert!(!other.is_transient());
        assert_eq!(other.to_string(), "INVALID_CHANNEL");
    }

    #[test]
    fn events_read_from_yaml() {
        let events: Vec<ProviderEvent> = serde_yml::from_str(
            r#"
- event: remote_stream_subscribed
  peer: 1
- event: peer_left
  peer: abc
- event: media_access
  permission: denied
- event: error
  kind: DYNAMIC_KEY_TIMEOUT
"#,
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                ProviderEvent::RemoteStreamSubscribed { peer: 1u64.into() },
                ProviderEvent::PeerLeft { peer: "abc".into() },
                ProviderEvent::MediaAccess {
                    permission: MediaPermission::Denied
                },
                ProviderEvent::Error {
                    kind: ProviderErrorKind::DynamicKeyTimeout
                },
            ]
        );
    }
}
