//! Shared device types and errors.

use std::time::Instant;
use thiserror::Error;

/// A single timestamped heart-rate reading.
#[derive(Debug, Clone, Copy)]
pub struct HeartRateSample {
    /// When the reading was taken
    pub timestamp: Instant,
    /// Heart rate in BPM
    pub bpm: u16,
}

impl HeartRateSample {
    /// Create a sample timestamped now.
    pub fn now(bpm: u16) -> Self {
        Self {
            timestamp: Instant::now(),
            bpm,
        }
    }
}

/// Connection state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,
    /// Connection in progress
    Connecting,
    /// Active connection
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting..."),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Events delivered by a heart-rate sample source.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A new reading arrived
    Sample(HeartRateSample),
    /// The source lost its connection and will stop delivering samples
    Disconnected,
}

/// Errors from a sample source adapter.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source is not connected
    #[error("heart rate source not connected")]
    NotConnected,

    /// A subscription is already active
    #[error("already subscribed")]
    AlreadySubscribed,

    /// Failed to set up sample delivery
    #[error("subscription failed: {0}")]
    SubscriptionFailed(String),
}

/// Errors from a speed actuator adapter.
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// Actuator is not connected
    #[error("treadmill not connected")]
    NotConnected,

    /// The device rejected or failed to apply the command
    #[error("speed command failed: {0}")]
    CommandFailed(String),
}
