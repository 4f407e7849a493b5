//! Capability interface of the media provider.
//!
//! The provider owns transport, signaling and codecs. The session only drives it
//! through these handles and learns about results through [`ProviderEvent`]s
//! pushed into the [`EventSink`] handed out when a handle is created.

use crate::{
    controller::Generation,
    events::{
        ParticipantId,
        ProviderEvent,
    },
};
use conference_config::{
    CodecHint,
    LocalUid,
    MediaTracks,
    SessionMode,
};
use eyre::Result;
use tokio::sync::mpsc::UnboundedSender;

/// Provider event stamped with the session generation it belongs to.
#[derive(Debug, Clone)]
pub struct StampedEvent {
    pub generation: Generation,
    pub event: ProviderEvent,
}

/// Where provider handlers deliver their events. Each sink is bound to the
/// generation of the session that created it.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: Generation,
    sender: UnboundedSender<StampedEvent>,
}

impl EventSink {
    pub fn new(generation: Generation, sender: UnboundedSender<StampedEvent>) -> Self {
        Self { generation, sender }
    }

    /// Returns `false` when the session is gone and the event was dropped.
    pub fn emit(&self, event: ProviderEvent) -> bool {
        trace!(%event, generation = %self.generation, "Provider emitted event");
        self.sender
            .send(StampedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

pub trait MediaProvider: Send + 'static {
    /// Creates the provider session and registers the peer, stream and error handlers.
    fn create_session(
        &mut self,
        mode: SessionMode,
        codec: CodecHint,
        events: EventSink,
    ) -> Result<Box<dyn SessionHandle>>;

    /// Creates the local capture handle and registers the media permission handlers.
    fn create_local_media(
        &mut self,
        uid: LocalUid,
        tracks: MediaTracks,
        events: EventSink,
    ) -> Result<Box<dyn MediaHandle>>;
}

pub trait SessionHandle: Send {
    /// Success is reported as [`ProviderEvent::RoomJoined`].
    fn join(&mut self, token: Option<&str>, room: &str, uid: LocalUid) -> Result<()>;
    fn publish(&mut self, media: &mut dyn MediaHandle) -> Result<()>;
    /// Confirmation is reported as [`ProviderEvent::RemoteStreamSubscribed`].
    fn subscribe(&mut self, peer: &ParticipantId, tracks: MediaTracks) -> Result<()>;
    fn play_remote(&mut self, peer: &ParticipantId, element_id: &str) -> Result<()>;
    fn stop_remote(&mut self, peer: &ParticipantId) -> Result<()>;
    fn renew_key(&mut self, token: &str) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
}

pub trait MediaHandle: Send {
    fn uid(&self) -> LocalUid;
    /// Readiness is reported as [`ProviderEvent::LocalMediaReady`].
    fn init(&mut self) -> Result<()>;
    fn play(&mut self, element_id: &str) -> Result<()>;
    fn mute_audio(&mut self) -> Result<()>;
    fn unmute_audio(&mut self) -> Result<()>;
    fn mute_video(&mut self) -> Result<()>;
    fn unmute_video(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}
