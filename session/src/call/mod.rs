use crate::{
    controller::{
        CallSessionController,
        ControllerSettings,
    },
    error::SessionError,
    provider::MediaProvider,
};
use conference_config::{
    MeetingDetails,
    SessionConfig,
};
use eyre::Result;
use messages::{
    CallLogMessage,
    CallMessage,
};
use std::sync::Arc;
use tokio::sync::{
    mpsc::{
        unbounded_channel,
        UnboundedReceiver,
        UnboundedSender,
    },
    watch,
};
use tokio_util::sync::{
    CancellationToken,
    DropGuard,
};

mod inner;
pub mod messages;
mod state;

use inner::CallSessionInner;
pub use state::{
    NotificationFlags,
    SessionSnapshot,
    SessionState,
};

/// Handle to a call session running on its own task. Dropping the last clone
/// cancels the task, which releases the provider handles.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub name: String,
    pub created: chrono::DateTime<chrono::Utc>,
    pub details: MeetingDetails,
    pub state: watch::Receiver<SessionSnapshot>,
    _session_task_guard: Arc<DropGuard>,
    sender: UnboundedSender<CallMessage>,
}

impl PartialEq for CallSession {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.created == other.created
    }
}

impl CallSession {
    /// Spawns the session worker on the current tokio runtime.
    pub fn spawn<P: MediaProvider>(
        name: impl ToString,
        settings: ControllerSettings,
        provider: P,
        details: MeetingDetails,
    ) -> (Self, UnboundedReceiver<CallLogMessage>) {
        let name = name.to_string();
        let (sender_tx, receiver_tx) = unbounded_channel::<CallMessage>();
        let (sender_rx, receiver_rx) = unbounded_channel::<CallLogMessage>();

        let task_cancellation_token = CancellationToken::new();
        let task_cancellation_guard = task_cancellation_token.clone().drop_guard();
        let (state_sender, state_receiver) = watch::channel(SessionSnapshot::default());

        tokio::task::spawn({
            let name = name.clone();
            let controller = CallSessionController::new(settings);
            async move {
                tokio::select! {
                    biased;
                    _ = task_cancellation_token.cancelled() => {},

                    result = CallSessionInner::run(
                        name.clone(),
                        controller,
                        provider,
                        receiver_tx,
                        sender_rx.clone(),
                        state_sender,
                    ) => {
                        if let Err(err) = result {
                            error!(?name, "Call session failed: {err}");
                            let _ = sender_rx.send(CallLogMessage::new("error", &name, format!("Call session failed: {err}")));
                        }
                    }
                };

                debug!(?name, "Call session task finished");
                let _ = sender_rx.send(CallLogMessage::new(
                    "debug",
                    &name,
                    format!("Call session {name} has been closed"),
                ));
            }
        });

        (
            Self {
                name,
                created: chrono::Utc::now(),
                details,
                state: state_receiver,
                _session_task_guard: Arc::new(task_cancellation_guard),
                sender: sender_tx,
            },
            receiver_rx,
        )
    }
}

impl CallSession {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Asks the worker to join. An empty join code is rejected right here
    /// before anything reaches the provider.
    pub fn join(&self, config: SessionConfig) -> Result<(), SessionError> {
        if !config.has_join_code() {
            debug!(self.name, "Not joining without a join code");
            return Err(SessionError::InvalidConfig);
        }
        self.try_send(CallMessage::Join(config))
    }

    pub fn leave(&self) {
        self.send_message(CallMessage::Leave);
    }

    pub fn toggle_audio(&self) {
        self.send_message(CallMessage::ToggleAudio);
    }

    pub fn toggle_video(&self) {
        self.send_message(CallMessage::ToggleVideo);
    }

    pub fn send_message(&self, message: CallMessage) {
        if let Err(err) = self.try_send(message) {
            error!(self.name, "{err}");
        }
    }

    /// Like [`CallSession::send_message`] but fails once the worker is gone.
    pub fn try_send(&self, message: CallMessage) -> Result<(), SessionError> {
        let text = message.to_string();
        self.sender.send(message).map_err(|_| SessionError::Closed)?;
        debug!("Sent message {text}");
        Ok(())
    }

    /// Waits until the published snapshot satisfies `predicate`.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&SessionSnapshot) -> bool) -> Result<SessionSnapshot> {
        let snapshot = self.state.wait_for(predicate).await?;
        Ok(snapshot.clone())
    }

    /// Leaves the room and stops the worker.
    pub async fn close(mut self) {
        if !self.state.borrow().running {
            debug!(self.name, "Call session already closed");
            return;
        }
        if self.sender.send(CallMessage::Close).is_ok() {
            if let Err(err) = self.state.wait_for(|state| !state.running).await {
                error!("Failed to wait for the call session to close: {err}");
            };
        } else {
            error!("Was not able to send CallMessage::Close message")
        }
    }
}
