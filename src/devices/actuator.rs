//! Speed actuator contract and simulated treadmill.

use crate::devices::types::{ActuatorError, ConnectionState};
use std::sync::{Arc, Mutex};

/// Lowest speed the simulated belt can run at.
const HARDWARE_MIN_KMH: f32 = 0.0;

/// Highest speed the simulated belt can run at.
const HARDWARE_MAX_KMH: f32 = 20.0;

/// Belt speed resolution, matching the 0.01 km/h FTMS unit.
const SPEED_RESOLUTION_KMH: f32 = 0.01;

/// Command surface of a treadmill.
///
/// Adapters own the physical connection; the controller only ever asks for
/// a target speed and reads back what was actually applied.
pub trait SpeedActuator: Send {
    /// Command a target speed. Returns the speed the device actually
    /// applied, which may differ after hardware clamping/quantization.
    fn set_speed(&mut self, kmh: f32) -> Result<f32, ActuatorError>;

    /// The most recently applied speed.
    fn applied_speed(&self) -> f32;

    /// Whether the device connection is live.
    fn is_connected(&self) -> bool;
}

#[derive(Debug)]
struct TreadmillState {
    connection_state: ConnectionState,
    applied_kmh: f32,
    /// Number of upcoming commands that should fail
    fail_next: u32,
}

/// An in-process treadmill that applies commands instantly.
///
/// Clamps to its hardware range, quantizes to the belt resolution, and can
/// be scripted to fail commands for exercising error paths. Clones share
/// the same belt, so a test can keep one and observe what the controller
/// commanded.
#[derive(Debug, Clone)]
pub struct SimulatedTreadmill {
    state: Arc<Mutex<TreadmillState>>,
}

impl SimulatedTreadmill {
    /// Create a disconnected simulated treadmill.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TreadmillState {
                connection_state: ConnectionState::Disconnected,
                applied_kmh: 0.0,
                fail_next: 0,
            })),
        }
    }

    /// Create a simulated treadmill that is already connected.
    pub fn connected() -> Self {
        let treadmill = Self::new();
        treadmill.connect();
        treadmill
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TreadmillState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Establish the (simulated) connection.
    pub fn connect(&self) {
        self.lock().connection_state = ConnectionState::Connected;
        tracing::info!("Simulated treadmill connected");
    }

    /// Drop the (simulated) connection.
    pub fn disconnect(&self) {
        self.lock().connection_state = ConnectionState::Disconnected;
        tracing::info!("Simulated treadmill disconnected");
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.lock().connection_state
    }

    /// Make the next `count` speed commands fail.
    pub fn fail_next_commands(&self, count: u32) {
        self.lock().fail_next = count;
    }
}

impl Default for SimulatedTreadmill {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedActuator for SimulatedTreadmill {
    fn set_speed(&mut self, kmh: f32) -> Result<f32, ActuatorError> {
        let mut state = self.lock();

        if state.connection_state != ConnectionState::Connected {
            return Err(ActuatorError::NotConnected);
        }

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(ActuatorError::CommandFailed(
                "simulated write failure".to_string(),
            ));
        }

        let clamped = kmh.clamp(HARDWARE_MIN_KMH, HARDWARE_MAX_KMH);
        let quantized = (clamped / SPEED_RESOLUTION_KMH).round() * SPEED_RESOLUTION_KMH;

        state.applied_kmh = quantized;
        tracing::debug!("Treadmill speed set to {:.2} km/h", quantized);

        Ok(quantized)
    }

    fn applied_speed(&self) -> f32 {
        self.lock().applied_kmh
    }

    fn is_connected(&self) -> bool {
        self.lock().connection_state == ConnectionState::Connected
    }
}
