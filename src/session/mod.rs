//! Workout session state machine, feedback policy, and worker task.

pub mod controller;
pub mod service;
pub mod stats;
pub mod telemetry;
pub mod types;

pub use controller::{Decision, SessionController};
pub use service::{ServiceConfig, SessionCommand, SessionService};
pub use telemetry::{TelemetryBuffer, TelemetryPoint, TELEMETRY_CAPACITY};
pub use types::{
    SessionError, SessionEvent, SessionSnapshot, SessionState, SpeedBounds, StatusMessage,
};
