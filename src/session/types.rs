//! Session types, events, and errors.

use crate::devices::types::ActuatorError;
use crate::session::telemetry::TelemetryPoint;
use crate::zones::{ZoneBounds, ZoneError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

/// How long a status message stays visible.
pub const STATUS_DISPLAY_SECS: u64 = 5;

/// Lowest configurable belt speed in km/h.
pub const MIN_CONFIGURABLE_KMH: f32 = 0.5;

/// Highest configurable belt speed in km/h.
pub const MAX_CONFIGURABLE_KMH: f32 = 20.0;

/// Workout session state.
///
/// Exactly one instance per controller; all transitions are validated so
/// contradictory combinations ("paused while idle") cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session running
    #[default]
    Idle,
    /// Session running, accumulators and feedback policy live
    Active,
    /// Session frozen, speed held, sampling continues for display
    Paused,
    /// Ramping the belt down to minimum speed before returning to idle
    Stopping,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Active => write!(f, "Active"),
            SessionState::Paused => write!(f, "Paused"),
            SessionState::Stopping => write!(f, "Stopping"),
        }
    }
}

/// Configured speed envelope of the belt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBounds {
    /// Minimum speed in km/h
    pub min_kmh: f32,
    /// Maximum speed in km/h
    pub max_kmh: f32,
    /// Speed change per feedback decision in km/h
    pub step_kmh: f32,
}

impl SpeedBounds {
    /// Validate the bounds invariants.
    pub fn validate(&self) -> Result<(), SessionError> {
        if !self.min_kmh.is_finite() || !self.max_kmh.is_finite() || !self.step_kmh.is_finite() {
            return Err(SessionError::InvalidInput(
                "speed bounds must be finite".to_string(),
            ));
        }
        if self.min_kmh < MIN_CONFIGURABLE_KMH {
            return Err(SessionError::InvalidInput(format!(
                "min speed {:.2} below {:.1} km/h",
                self.min_kmh, MIN_CONFIGURABLE_KMH
            )));
        }
        if self.max_kmh > MAX_CONFIGURABLE_KMH {
            return Err(SessionError::InvalidInput(format!(
                "max speed {:.2} above {:.1} km/h",
                self.max_kmh, MAX_CONFIGURABLE_KMH
            )));
        }
        if self.min_kmh >= self.max_kmh {
            return Err(SessionError::InvalidInput(format!(
                "min speed {:.2} >= max speed {:.2}",
                self.min_kmh, self.max_kmh
            )));
        }
        if self.step_kmh <= 0.0 || self.step_kmh > self.max_kmh - self.min_kmh {
            return Err(SessionError::InvalidInput(format!(
                "speed step {:.2} outside (0, {:.2}]",
                self.step_kmh,
                self.max_kmh - self.min_kmh
            )));
        }
        Ok(())
    }
}

impl Default for SpeedBounds {
    fn default() -> Self {
        Self {
            min_kmh: 1.0,
            max_kmh: 5.0,
            step_kmh: 0.1,
        }
    }
}

/// A transient status message shown to the user.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    /// Message text
    pub text: String,
    /// When the message was posted
    pub posted_at: Instant,
}

impl StatusMessage {
    /// Create a message posted now.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            posted_at: Instant::now(),
        }
    }

    /// Whether the display window has elapsed.
    pub fn is_expired(&self) -> bool {
        self.posted_at.elapsed() >= Duration::from_secs(STATUS_DISPLAY_SECS)
    }
}

/// Events emitted by the session controller.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session state transition
    StateChanged(SessionState),
    /// Transient status message
    Status(String),
    /// A new speed was applied to the belt
    SpeedChanged(f32),
    /// A command was rejected without changing state
    CommandRejected(String),
}

/// Point-in-time copy of everything a display needs.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Id of the running or most recent session
    pub session_id: Option<Uuid>,
    /// Current session state
    pub state: SessionState,
    /// Latest heart-rate reading
    pub current_bpm: Option<u16>,
    /// Zone the latest reading falls into
    pub current_zone: Option<u8>,
    /// Currently applied belt speed in km/h
    pub current_speed_kmh: f32,
    /// Resolved target range, if a selection is set
    pub target: Option<ZoneBounds>,
    /// Configured speed envelope
    pub speed_bounds: SpeedBounds,
    /// Seconds of active session time
    pub elapsed_seconds: u32,
    /// Accumulated distance in km
    pub distance_km: f64,
    /// Estimated calories burned
    pub calories: u32,
    /// Heart-rate history for the chart
    pub heart_rate: Vec<TelemetryPoint>,
    /// Speed history for the chart
    pub speed: Vec<TelemetryPoint>,
    /// Unexpired status message, if any
    pub status: Option<String>,
}

/// Errors from session commands.
///
/// All of these are recoverable: they are reported to the caller and never
/// change controller state or terminate processing.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed configuration value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Command not valid in the current state
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The actuator failed to apply a speed
    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    /// The sample source reported loss of connection
    #[error("heart rate source disconnected")]
    SourceDisconnected,

    /// Zone calculation rejected the input
    #[error(transparent)]
    Zone(#[from] ZoneError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_bounds_validation() {
        assert!(SpeedBounds::default().validate().is_ok());

        let inverted = SpeedBounds {
            min_kmh: 5.0,
            max_kmh: 1.0,
            step_kmh: 0.1,
        };
        assert!(matches!(
            inverted.validate(),
            Err(SessionError::InvalidInput(_))
        ));

        let zero_step = SpeedBounds {
            step_kmh: 0.0,
            ..Default::default()
        };
        assert!(zero_step.validate().is_err());

        let oversized_step = SpeedBounds {
            min_kmh: 1.0,
            max_kmh: 2.0,
            step_kmh: 1.5,
        };
        assert!(oversized_step.validate().is_err());

        let below_floor = SpeedBounds {
            min_kmh: 0.2,
            ..Default::default()
        };
        assert!(below_floor.validate().is_err());

        let above_ceiling = SpeedBounds {
            max_kmh: 25.0,
            ..Default::default()
        };
        assert!(above_ceiling.validate().is_err());
    }

    #[test]
    fn test_status_message_expiry() {
        let message = StatusMessage::new("Workout started!");
        assert!(!message.is_expired());

        let stale = StatusMessage {
            text: "old".to_string(),
            posted_at: Instant::now() - Duration::from_secs(STATUS_DISPLAY_SECS + 1),
        };
        assert!(stale.is_expired());
    }
}
