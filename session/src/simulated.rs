//! In-process provider that records every call and answers the way a real
//! provider would: media init reports permission and readiness, join reports
//! success and subscriptions are confirmed. Remote peers are scripted through
//! [`SimulatedRemote`].

use crate::{
    events::{
        MediaPermission,
        ParticipantId,
        ProviderEvent,
    },
    provider::{
        EventSink,
        MediaHandle,
        MediaProvider,
        SessionHandle,
    },
};
use conference_config::{
    CodecHint,
    LocalUid,
    MediaTracks,
    SessionMode,
};
use eyre::{
    bail,
    Result,
};
use serde::Serialize;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};

/// One call made against the provider, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ProviderCall {
    CreateSession { mode: SessionMode, codec: CodecHint },
    CreateLocalMedia { uid: LocalUid, tracks: MediaTracks },
    InitLocalMedia,
    PlayLocal { element_id: String },
    Join { token: Option<String>, room: String, uid: LocalUid },
    Publish { uid: LocalUid },
    Subscribe { peer: ParticipantId },
    PlayRemote { peer: ParticipantId, element_id: String },
    StopRemote { peer: ParticipantId },
    RenewKey { token: String },
    MuteAudio,
    UnmuteAudio,
    MuteVideo,
    UnmuteVideo,
    Leave,
    CloseLocalMedia,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared, ordered record of provider calls.
#[derive(Debug, Clone, Default)]
pub struct ProviderCallLog(Arc<Mutex<Vec<ProviderCall>>>);

impl ProviderCallLog {
    fn push(&self, call: ProviderCall) {
        debug!(?call, "Simulated provider call");
        lock(&self.0).push(call);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.0).clone()
    }

    pub fn count(&self, predicate: impl Fn(&ProviderCall) -> bool) -> usize {
        lock(&self.0).iter().filter(|call| predicate(call)).count()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.0).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

/// How the simulated provider answers calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedBehavior {
    /// Permission reported on media init. Denied media never becomes ready.
    pub media_permission: MediaPermission,
    pub confirm_join: bool,
    pub confirm_subscriptions: bool,
}

impl Default for SimulatedBehavior {
    fn default() -> Self {
        Self {
            media_permission: MediaPermission::Granted,
            confirm_join: true,
            confirm_subscriptions: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedProvider {
    behavior: SimulatedBehavior,
    calls: ProviderCallLog,
    current: Arc<Mutex<Option<EventSink>>>,
}

impl SimulatedProvider {
    pub fn new(behavior: SimulatedBehavior) -> Self {
        Self {
            behavior,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> ProviderCallLog {
        self.calls.clone()
    }

    /// Handle for scripting what remote peers do in the most recent session.
    pub fn remote(&self) -> SimulatedRemote {
        SimulatedRemote {
            current: self.current.clone(),
        }
    }
}

impl MediaProvider for SimulatedProvider {
    fn create_session(
        &mut self,
        mode: SessionMode,
        codec: CodecHint,
        events: EventSink,
    ) -> Result<Box<dyn SessionHandle>> {
        self.calls.push(ProviderCall::CreateSession { mode, codec });
        *lock(&self.current) = Some(events.clone());
        Ok(Box::new(SimulatedSession {
            behavior: self.behavior,
            calls: self.calls.clone(),
            events,
            left: false,
        }))
    }

    fn create_local_media(
        &mut self,
        uid: LocalUid,
        tracks: MediaTracks,
        events: EventSink,
    ) -> Result<Box<dyn MediaHandle>> {
        self.calls.push(ProviderCall::CreateLocalMedia { uid, tracks });
        Ok(Box::new(SimulatedMedia {
            uid,
            behavior: self.behavior,
            calls: self.calls.clone(),
            events,
            closed: false,
        }))
    }
}

/// Emits remote side events into the latest simulated session.
#[derive(Debug, Clone)]
pub struct SimulatedRemote {
    current: Arc<Mutex<Option<EventSink>>>,
}

impl SimulatedRemote {
    /// Returns `false` if there is no session to deliver to.
    pub fn emit(&self, event: ProviderEvent) -> bool {
        match lock(&self.current).as_ref() {
            Some(sink) => sink.emit(event),
            None => {
                warn!(%event, "No simulated session to deliver the event to");
                false
            }
        }
    }

    /// Remote stream shows up and, if confirmations are on, gets subscribed.
    pub fn peer_joins(&self, peer: impl Into<ParticipantId>) -> bool {
        self.emit(ProviderEvent::RemoteStreamAdded { peer: peer.into() })
    }

    pub fn peer_leaves(&self, peer: impl Into<ParticipantId>) -> bool {
        self.emit(ProviderEvent::PeerLeft { peer: peer.into() })
    }
}

struct SimulatedSession {
    behavior: SimulatedBehavior,
    calls: ProviderCallLog,
    events: EventSink,
    left: bool,
}

impl SimulatedSession {
    fn ensure_joined(&self) -> Result<()> {
        if self.left {
            bail!("simulated session already left");
        }
        Ok(())
    }
}

impl SessionHandle for SimulatedSession {
    fn join(&mut self, token: Option<&str>, room: &str, uid: LocalUid) -> Result<()> {
        self.ensure_joined()?;
        self.calls.push(ProviderCall::Join {
            token: token.map(ToString::to_string),
            room: room.to_string(),
            uid,
        });
        if self.behavior.confirm_join {
            self.events.emit(ProviderEvent::RoomJoined { uid });
        }
        Ok(())
    }

    fn publish(&mut self, media: &mut dyn MediaHandle) -> Result<()> {
        self.ensure_joined()?;
        self.calls.push(ProviderCall::Publish { uid: media.uid() });
        Ok(())
    }

    fn subscribe(&mut self, peer: &ParticipantId, _tracks: MediaTracks) -> Result<()> {
        self.ensure_joined()?;
        self.calls.push(ProviderCall::Subscribe { peer: peer.clone() });
        if self.behavior.confirm_subscriptions {
            self.events
                .emit(ProviderEvent::RemoteStreamSubscribed { peer: peer.clone() });
        }
        Ok(())
    }

    fn play_remote(&mut self, peer: &ParticipantId, element_id: &str) -> Result<()> {
        self.calls.push(ProviderCall::PlayRemote {
            peer: peer.clone(),
            element_id: element_id.to_string(),
        });
        Ok(())
    }

    fn stop_remote(&mut self, peer: &ParticipantId) -> Result<()> {
        self.calls.push(ProviderCall::StopRemote { peer: peer.clone() });
        Ok(())
    }

    fn renew_key(&mut self, token: &str) -> Result<()> {
        self.ensure_joined()?;
        self.calls.push(ProviderCall::RenewKey {
            token: token.to_string(),
        });
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.ensure_joined()?;
        self.left = true;
        self.calls.push(ProviderCall::Leave);
        Ok(())
    }
}

struct SimulatedMedia {
    uid: LocalUid,
    behavior: SimulatedBehavior,
    calls: ProviderCallLog,
    events: EventSink,
    closed: bool,
}

impl SimulatedMedia {
    fn record(&self, call: ProviderCall) -> Result<()> {
        if self.closed {
            bail!("simulated local media already closed");
        }
        self.calls.push(call);
        Ok(())
    }
}

impl MediaHandle for SimulatedMedia {
    fn uid(&self) -> LocalUid {
        self.uid
    }

    fn init(&mut self) -> Result<()> {
        self.record(ProviderCall::InitLocalMedia)?;
        let permission = self.behavior.media_permission;
        self.events.emit(ProviderEvent::MediaAccess { permission });
        if permission == MediaPermission::Granted {
            self.events.emit(ProviderEvent::LocalMediaReady);
        }
        Ok(())
    }

    fn play(&mut self, element_id: &str) -> Result<()> {
        self.record(ProviderCall::PlayLocal {
            element_id: element_id.to_string(),
        })
    }

    fn mute_audio(&mut self) -> Result<()> {
        self.record(ProviderCall::MuteAudio)
    }

    fn unmute_audio(&mut self) -> Result<()> {
        self.record(ProviderCall::UnmuteAudio)
    }

    fn mute_video(&mut self) -> Result<()> {
        self.record(ProviderCall::MuteVideo)
    }

    fn unmute_video(&mut self) -> Result<()> {
        self.record(ProviderCall::UnmuteVideo)
    }

    fn close(&mut self) -> Result<()> {
        self.record(ProviderCall::CloseLocalMedia)?;
        self.closed = true;
        Ok(())
    }
}
