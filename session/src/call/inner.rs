use super::{
    messages::{
        CallLogMessage,
        CallMessage,
    },
    SessionSnapshot,
};
use crate::{
    controller::{
        Admission,
        CallSessionController,
    },
    effects::Effect,
    error::SessionError,
    events::ParticipantId,
    provider::{
        EventSink,
        MediaHandle,
        MediaProvider,
        SessionHandle,
        StampedEvent,
    },
};
use eyre::{
    Context as _,
    OptionExt as _,
    Result,
};
use tokio::sync::{
    mpsc::{
        unbounded_channel,
        UnboundedReceiver,
        UnboundedSender,
    },
    watch,
};
use tokio_util::sync::CancellationToken;

/// Deferred playback that came due.
#[derive(Debug)]
struct PlaybackDue {
    peer: ParticipantId,
    admission: Admission,
}

/// Provider handles of the running session. Released exactly once, either by an
/// explicit teardown or when dropped.
#[derive(Default)]
struct ProviderResources {
    session: Option<Box<dyn SessionHandle>>,
    media: Option<Box<dyn MediaHandle>>,
}

impl ProviderResources {
    fn session(&mut self) -> Result<&mut Box<dyn SessionHandle>> {
        self.session.as_mut().ok_or_eyre("no provider session")
    }

    fn media(&mut self) -> Result<&mut Box<dyn MediaHandle>> {
        self.media.as_mut().ok_or_eyre("no local media")
    }

    fn leave_session(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.leave().context("failed to leave the provider session"),
            None => Ok(()),
        }
    }

    fn close_media(&mut self) -> Result<()> {
        match self.media.take() {
            Some(mut media) => media.close().context("failed to close local media"),
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        if let Err(err) = self.leave_session() {
            error!("{err:#}");
        }
        if let Err(err) = self.close_media() {
            error!("{err:#}");
        }
    }
}

impl Drop for ProviderResources {
    fn drop(&mut self) {
        if self.session.is_some() || self.media.is_some() {
            debug!("Releasing provider resources on drop");
            self.release();
        }
    }
}

/// Async call "worker" that owns the provider and the state machine.
/// It feeds user messages, provider events and due playbacks into the
/// controller and executes the resulting effects against the provider.
pub(super) struct CallSessionInner<P> {
    name: String,
    controller: CallSessionController,
    provider: P,
    resources: ProviderResources,
    state: watch::Sender<SessionSnapshot>,
    log: UnboundedSender<CallLogMessage>,
    events: UnboundedSender<StampedEvent>,
    playback: UnboundedSender<PlaybackDue>,
    /// Cancels the deferred playbacks of the current session.
    pending: CancellationToken,
}

impl<P: MediaProvider> CallSessionInner<P> {
    #[instrument(level = "debug", skip_all, fields(name = %name))]
    pub(super) async fn run(
        name: String,
        controller: CallSessionController,
        provider: P,
        receiver: UnboundedReceiver<CallMessage>,
        log: UnboundedSender<CallLogMessage>,
        state: watch::Sender<SessionSnapshot>,
    ) -> Result<()> {
        let (events, events_rx) = unbounded_channel();
        let (playback, playback_rx) = unbounded_channel();

        let inner = Self {
            name,
            controller,
            provider,
            resources: ProviderResources::default(),
            state,
            log,
            events,
            playback,
            pending: CancellationToken::new(),
        };

        inner.handle_actions(receiver, events_rx, playback_rx).await
    }

    async fn handle_actions(
        mut self,
        mut receiver: UnboundedReceiver<CallMessage>,
        mut events: UnboundedReceiver<StampedEvent>,
        mut playback: UnboundedReceiver<PlaybackDue>,
    ) -> Result<()> {
        self.publish_state(true);

        loop {
            tokio::select! {
                biased;

                message = receiver.recv() => {
                    let Some(message) = message else {
                        debug!(self.name, "Call handle dropped");
                        break;
                    };
                    if let CallMessage::Close = message {
                        break;
                    }
                    self.handle_message(message);
                }

                Some(StampedEvent { generation, event }) = events.recv() => {
                    if generation != self.controller.generation() {
                        debug!(%event, %generation, "Dropping event of a previous session");
                        continue;
                    }
                    match self.controller.handle_event(event) {
                        Ok(effects) => self.apply(effects),
                        Err(err) => self.report(&err),
                    }
                    self.check_rejection();
                }

                Some(PlaybackDue { peer, admission }) = playback.recv() => {
                    let effects = self.controller.playback_due(&peer, admission);
                    self.apply(effects);
                }
            }

            self.publish_state(true);
        }

        let effects = self.controller.request_leave();
        self.apply(effects);
        self.resources.release();
        self.publish_state(false);

        info!(self.name, "Closed the call session");

        Ok(())
    }

    fn handle_message(&mut self, message: CallMessage) {
        debug!(self.name, %message, "Handling message");
        let effects = match message {
            CallMessage::Join(config) => match self.controller.request_join(config) {
                Ok(effects) => effects,
                Err(err) => {
                    self.report(&err);
                    return;
                }
            },
            CallMessage::Leave => self.controller.request_leave(),
            CallMessage::ToggleAudio => self.controller.toggle_local_audio(),
            CallMessage::ToggleVideo => self.controller.toggle_local_video(),
            CallMessage::Close => return,
        };
        self.apply(effects);
    }

    fn check_rejection(&mut self) {
        let snapshot = self.state.borrow().clone();
        let flags = self.controller.flags();
        if flags.ongoing_meeting == Some(true) && snapshot.flags.ongoing_meeting != Some(true) {
            self.report(&SessionError::RoomOccupied);
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            trace!(%effect, "Applying effect");
            if let Err(err) = self.apply_one(effect.clone()) {
                let err = SessionError::Provider(err.wrap_err(format!("running {effect} failed")));
                self.report(&err);
            }
        }
    }

    fn apply_one(&mut self, effect: Effect) -> Result<()> {
        match effect {
            Effect::CreateSession { mode, codec } => {
                // A previous session may still hold handles if its teardown failed.
                self.resources.release();
                let sink = self.sink();
                self.resources.session = Some(self.provider.create_session(mode, codec, sink)?);
            }
            Effect::CreateLocalMedia { uid, tracks } => {
                let sink = self.sink();
                self.resources.media = Some(self.provider.create_local_media(uid, tracks, sink)?);
            }
            Effect::InitLocalMedia => self.resources.media()?.init()?,
            Effect::PlayLocal { element_id } => self.resources.media()?.play(&element_id)?,
            Effect::JoinRoom { token, room, uid } => {
                self.resources.session()?.join(token.as_deref(), &room, uid)?;
                info!(self.name, %room, "Join requested");
            }
            Effect::Publish => {
                let ProviderResources { session, media } = &mut self.resources;
                let session = session.as_mut().ok_or_eyre("no provider session")?;
                let media = media.as_mut().ok_or_eyre("no local media")?;
                session.publish(&mut **media)?;
            }
            Effect::Subscribe { peer, tracks } => self.resources.session()?.subscribe(&peer, tracks)?,
            Effect::StopRemote { peer } => self.resources.session()?.stop_remote(&peer)?,
            Effect::SchedulePlayback { peer, admission, delay } => self.schedule_playback(peer, admission, delay),
            Effect::PlayRemote { peer, element_id } => {
                self.resources.session()?.play_remote(&peer, &element_id)?;
                info!(self.name, %peer, "Playing remote stream");
            }
            Effect::MuteAudio => self.resources.media()?.mute_audio()?,
            Effect::UnmuteAudio => self.resources.media()?.unmute_audio()?,
            Effect::MuteVideo => self.resources.media()?.mute_video()?,
            Effect::UnmuteVideo => self.resources.media()?.unmute_video()?,
            Effect::RenewKey { token } => self.resources.session()?.renew_key(&token)?,
            Effect::LeaveRoom => {
                self.pending.cancel();
                self.pending = CancellationToken::new();
                self.resources.leave_session()?;
            }
            Effect::CloseLocalMedia => self.resources.close_media()?,
        }
        Ok(())
    }

    fn sink(&self) -> EventSink {
        EventSink::new(self.controller.generation(), self.events.clone())
    }

    fn schedule_playback(&self, peer: ParticipantId, admission: Admission, delay: std::time::Duration) {
        let token = self.pending.clone();
        let sender = self.playback.clone();
        tokio::task::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(%peer, %admission, "Deferred playback cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = sender.send(PlaybackDue { peer, admission });
                }
            }
        });
    }

    fn report(&self, err: &SessionError) {
        let level = if err.is_fatal() {
            error!(self.name, "{err}");
            "error"
        } else {
            warn!(self.name, "{err}");
            "warn"
        };
        let _ = self.log.send(CallLogMessage::new(level, &self.name, err));
    }

    fn publish_state(&self, running: bool) {
        let mut snapshot = self.controller.snapshot();
        snapshot.running = running;
        self.state.send_if_modified(|state| {
            if *state == snapshot {
                false
            } else {
                *state = snapshot;
                true
            }
        });
    }
}
