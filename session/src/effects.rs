use crate::{
    controller::Admission,
    events::ParticipantId,
};
use conference_config::{
    CodecHint,
    LocalUid,
    MediaTracks,
    SessionMode,
};
use derive_more::Display;
use std::time::Duration;

/// Provider instruction produced by the controller. The driver executes them in order.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Connect to the provider and register the session event handlers.
    #[display("CreateSession({mode}, {codec})")]
    CreateSession { mode: SessionMode, codec: CodecHint },
    /// Create the local capture handle and register its permission handlers.
    #[display("CreateLocalMedia({uid})")]
    CreateLocalMedia { uid: LocalUid, tracks: MediaTracks },
    InitLocalMedia,
    #[display("PlayLocal({element_id})")]
    PlayLocal { element_id: String },
    #[display("JoinRoom({room}, {uid})")]
    JoinRoom {
        token: Option<String>,
        room: String,
        uid: LocalUid,
    },
    Publish,
    #[display("Subscribe({peer})")]
    Subscribe { peer: ParticipantId, tracks: MediaTracks },
    #[display("StopRemote({peer})")]
    StopRemote { peer: ParticipantId },
    /// Play the admitted stream once `delay` elapsed, unless `admission` is stale by then.
    #[display("SchedulePlayback({peer}, {admission}, {delay:?})")]
    SchedulePlayback {
        peer: ParticipantId,
        admission: Admission,
        delay: Duration,
    },
    #[display("PlayRemote({peer})")]
    PlayRemote { peer: ParticipantId, element_id: String },
    MuteAudio,
    UnmuteAudio,
    MuteVideo,
    UnmuteVideo,
    #[display("RenewKey")]
    RenewKey { token: String },
    LeaveRoom,
    CloseLocalMedia,
}
