#[macro_use]
extern crate tracing;

pub mod call;
pub mod controller;
pub mod effects;
pub mod error;
pub mod events;
pub mod provider;
pub mod simulated;

pub use call::{
    CallSession,
    NotificationFlags,
    SessionSnapshot,
    SessionState,
};
pub use controller::{
    Admission,
    CallSessionController,
    ControllerSettings,
    Generation,
};
pub use error::SessionError;
pub use events::{
    ParticipantId,
    ProviderEvent,
};
