#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("A join code is required to join a meeting")]
    InvalidConfig,
    #[error("The room already has an ongoing meeting")]
    RoomOccupied,
    #[error("The media provider reported a fatal error: {reason}")]
    ProviderFatal { reason: String },
    #[error("Calling the media provider failed: {0}")]
    Provider(eyre::Report),
    #[error("The call session is no longer running")]
    Closed,
}

impl SessionError {
    /// Whether the session is still usable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::ProviderFatal { .. } | SessionError::Provider(_) | SessionError::Closed
        )
    }
}
