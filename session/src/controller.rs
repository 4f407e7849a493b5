use crate::{
    call::{
        NotificationFlags,
        SessionSnapshot,
        SessionState,
    },
    effects::Effect,
    error::SessionError,
    events::{
        MediaPermission,
        ParticipantId,
        ProviderErrorKind,
        ProviderEvent,
    },
};
use conference_config::{
    CodecHint,
    Config,
    MediaTracks,
    SessionConfig,
    SessionMode,
};
use derive_more::Display;
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

/// Identifies one join attempt. Bumped on every join and every teardown so that
/// late provider events of an older session can be told apart.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    fn bump(&mut self) {
        self.0 += 1;
    }
}

/// Identifies one admission of a remote peer. A deferred playback only plays
/// the admission it was scheduled for, even if the same peer comes back.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Admission(pub u64);

impl Admission {
    fn bump(&mut self) {
        self.0 += 1;
    }
}

/// Provider facing settings, fixed for the lifetime of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub mode: SessionMode,
    pub codec: CodecHint,
    pub local_tracks: MediaTracks,
    pub join_token: Option<String>,
    pub renewal_token: String,
    pub local_element_id: String,
    pub playback_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            mode: config.mode,
            codec: config.codec,
            local_tracks: config.local_tracks(),
            join_token: config.join_token.clone(),
            renewal_token: config.renewal_token.clone(),
            local_element_id: config.local_element_id.clone(),
            playback_delay: config.playback_delay(),
        }
    }
}

/// Call session state machine.
///
/// Every user action and provider event goes through one of the methods below,
/// which update the state and return the provider instructions to execute. The
/// controller never talks to a provider itself, which keeps it synchronous and
/// deterministic.
///
/// At most one remote participant is admitted. A second subscribed stream makes
/// the controller leave the room and raise `ongoing_meeting`.
#[derive(Debug, Clone)]
pub struct CallSessionController {
    settings: ControllerSettings,
    state: SessionState,
    flags: NotificationFlags,
    config: Option<SessionConfig>,
    admitted: Option<ParticipantId>,
    joined: Option<bool>,
    audio_muted: bool,
    video_muted: bool,
    published: bool,
    generation: Generation,
    admission: Admission,
    last_error: Option<String>,
}

impl CallSessionController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            state: SessionState::Idle,
            flags: NotificationFlags::default(),
            config: None,
            admitted: None,
            joined: None,
            audio_muted: false,
            video_muted: false,
            published: false,
            generation: Generation::default(),
            admission: Admission::default(),
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn flags(&self) -> NotificationFlags {
        self.flags
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn admitted(&self) -> Option<&ParticipantId> {
        self.admitted.as_ref()
    }

    pub fn admission(&self) -> Admission {
        self.admission
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            running: false,
            state: self.state,
            flags: self.flags,
            admitted: self.admitted.iter().cloned().collect(),
            joined: self.joined,
            audio_muted: self.audio_muted,
            video_muted: self.video_muted,
            join_code: self.config.as_ref().map(|c| c.join_code.clone()).unwrap_or_default(),
            display_name: self.config.as_ref().map(|c| c.display_name.clone()).unwrap_or_default(),
            local_uid: self.config.as_ref().map(|c| c.local_uid),
            generation: self.generation.0,
            last_error: self.last_error.clone(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, generation = %self.generation, "Session state changed");
            self.state = next;
        }
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// User actions

impl CallSessionController {
    /// Starts a join attempt. Only honoured while idle, other states ignore it.
    pub fn request_join(&mut self, config: SessionConfig) -> Result<Vec<Effect>, SessionError> {
        if !config.has_join_code() {
            warn!("Refusing to join without a join code");
            return Err(SessionError::InvalidConfig);
        }
        if self.state != SessionState::Idle {
            debug!(state = %self.state, "Join requested while not idle, ignoring");
            return Ok(Vec::new());
        }

        self.generation.bump();
        self.joined = Some(true);
        self.flags.ongoing_meeting = Some(false);
        self.audio_muted = false;
        self.video_muted = false;
        self.published = false;
        self.admitted = None;
        self.last_error = None;
        self.transition(SessionState::Joining);

        info!(
            join_code = %config.join_code,
            name = %config.display_name,
            uid = %config.local_uid,
            generation = %self.generation,
            "Joining meeting"
        );

        let effects = vec![
            Effect::CreateSession {
                mode: self.settings.mode,
                codec: self.settings.codec,
            },
            Effect::CreateLocalMedia {
                uid: config.local_uid,
                tracks: self.settings.local_tracks,
            },
            Effect::InitLocalMedia,
        ];
        self.config = Some(config);
        Ok(effects)
    }

    /// Tears the session down. A no-op while idle, so it is safe to call repeatedly.
    pub fn request_leave(&mut self) -> Vec<Effect> {
        if self.state == SessionState::Idle {
            debug!("Leave requested while idle, nothing to release");
            return Vec::new();
        }

        self.transition(SessionState::Leaving);
        self.generation.bump();
        self.admitted = None;
        self.config = None;
        self.joined = Some(false);
        self.audio_muted = false;
        self.video_muted = false;
        self.published = false;
        self.flags = NotificationFlags::after_leave();
        self.transition(SessionState::Idle);

        info!("Left the meeting");

        vec![Effect::LeaveRoom, Effect::CloseLocalMedia]
    }

    pub fn toggle_local_audio(&mut self) -> Vec<Effect> {
        if !self.state.is_live() {
            debug!("No local media to toggle audio on");
            return Vec::new();
        }
        let effect = if self.audio_muted {
            Effect::UnmuteAudio
        } else {
            Effect::MuteAudio
        };
        self.audio_muted = !self.audio_muted;
        vec![effect]
    }

    pub fn toggle_local_video(&mut self) -> Vec<Effect> {
        if !self.state.is_live() {
            debug!("No local media to toggle video on");
            return Vec::new();
        }
        let effect = if self.video_muted {
            Effect::UnmuteVideo
        } else {
            Effect::MuteVideo
        };
        self.video_muted = !self.video_muted;
        vec![effect]
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// Provider events

impl CallSessionController {
    pub fn handle_event(&mut self, event: ProviderEvent) -> Result<Vec<Effect>, SessionError> {
        if !self.state.is_live() {
            debug!(%event, state = %self.state, "Ignoring provider event outside of a session");
            return Ok(Vec::new());
        }
        trace!(%event, state = %self.state, "Handling provider event");

        let effects = match event {
            ProviderEvent::LocalMediaReady => self.on_local_media_ready(),
            ProviderEvent::RoomJoined { uid } => {
                if self.published {
                    debug!(%uid, "Repeated join confirmation, ignoring");
                    return Ok(Vec::new());
                }
                info!(%uid, "Joined the room, publishing local media");
                self.published = true;
                if self.state == SessionState::Joining {
                    self.transition(SessionState::Active);
                }
                vec![Effect::Publish]
            }
            ProviderEvent::MediaAccess { permission } => {
                let denied = permission == MediaPermission::Denied;
                if denied {
                    warn!("Access to local media was denied");
                }
                self.flags.media_denied = Some(denied);
                Vec::new()
            }
            ProviderEvent::PeerLeft { peer } => self.on_peer_left(peer),
            ProviderEvent::RemoteStreamAdded { peer } => vec![Effect::Subscribe {
                peer,
                tracks: MediaTracks::remote(),
            }],
            ProviderEvent::RemoteStreamSubscribed { peer } => self.on_remote_stream_subscribed(peer),
            ProviderEvent::RemoteStreamRemoved { peer } => self.on_remote_stream_removed(peer),
            ProviderEvent::Error { kind } => return self.on_provider_error(kind),
        };

        Ok(effects)
    }

    /// Fires once the render grace period of an admission is over.
    pub fn playback_due(&mut self, peer: &ParticipantId, admission: Admission) -> Vec<Effect> {
        if admission != self.admission || self.admitted.as_ref() != Some(peer) {
            debug!(%peer, %admission, current = %self.admission, "Dropping stale playback");
            return Vec::new();
        }
        vec![Effect::PlayRemote {
            peer: peer.clone(),
            element_id: peer.element_id(),
        }]
    }

    fn on_local_media_ready(&mut self) -> Vec<Effect> {
        let Some(config) = &self.config else {
            return Vec::new();
        };
        if self.state != SessionState::Joining {
            debug!("Local media ready outside of joining, ignoring");
            return Vec::new();
        }
        vec![
            Effect::PlayLocal {
                element_id: self.settings.local_element_id.clone(),
            },
            Effect::JoinRoom {
                token: self.settings.join_token.clone(),
                room: config.join_code.clone(),
                uid: config.local_uid,
            },
        ]
    }

    fn on_peer_left(&mut self, peer: ParticipantId) -> Vec<Effect> {
        info!(%peer, "Remote peer left");
        self.flags.remote_left = Some(true);
        if self.admitted.as_ref() == Some(&peer) {
            self.admitted = None;
            self.release_lock();
        }
        vec![Effect::StopRemote { peer }]
    }

    fn on_remote_stream_subscribed(&mut self, peer: ParticipantId) -> Vec<Effect> {
        match &self.admitted {
            None => {
                info!(%peer, "Admitting remote peer");
                self.flags.remote_left = Some(false);
                self.flags.waiting = false;
                self.transition(SessionState::SinglePeerLocked);
                self.admitted = Some(peer.clone());
                self.admission.bump();
                vec![Effect::SchedulePlayback {
                    peer,
                    admission: self.admission,
                    delay: self.settings.playback_delay,
                }]
            }
            Some(admitted) if admitted == &peer => {
                debug!(%peer, "Repeated subscription of the admitted peer");
                Vec::new()
            }
            Some(admitted) => {
                warn!(%peer, %admitted, "Second remote peer in the room, leaving");
                let effects = self.request_leave();
                self.flags.ongoing_meeting = Some(true);
                self.joined = None;
                effects
            }
        }
    }

    fn on_remote_stream_removed(&mut self, peer: ParticipantId) -> Vec<Effect> {
        info!(%peer, "Remote stream removed");
        self.flags.remote_left = Some(true);
        // Single peer sessions, so any removal clears the admission.
        self.admitted = None;
        self.release_lock();
        vec![Effect::StopRemote { peer }]
    }

    fn on_provider_error(&mut self, kind: ProviderErrorKind) -> Result<Vec<Effect>, SessionError> {
        if kind.is_transient() {
            info!("Signaling key expired, renewing");
            return Ok(vec![Effect::RenewKey {
                token: self.settings.renewal_token.clone(),
            }]);
        }
        error!(%kind, state = %self.state, "Provider reported a fatal error");
        let reason = kind.to_string();
        self.last_error = Some(reason.clone());
        Err(SessionError::ProviderFatal { reason })
    }

    fn release_lock(&mut self) {
        if self.state == SessionState::SinglePeerLocked {
            self.transition(SessionState::Active);
        }
    }
}
