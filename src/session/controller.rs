//! Workout session controller.
//!
//! The core state machine: owns the session state, the target zone, the
//! current belt speed, and the bounded-step hysteresis policy that keeps the
//! heart rate inside the target range. Consumes heart-rate samples, drives
//! the speed actuator, and emits status events for the UI.

use crate::devices::actuator::SpeedActuator;
use crate::devices::types::HeartRateSample;
use crate::session::stats::estimate_calories;
use crate::session::telemetry::{TelemetryBuffer, TelemetryPoint};
use crate::session::types::{
    SessionError, SessionEvent, SessionSnapshot, SessionState, SpeedBounds, StatusMessage,
};
use crate::zones::{self, ZoneBounds, ZoneSelection};
use crossbeam::channel::{Receiver, Sender};
use uuid::Uuid;

/// Default rider age when none has been configured.
const DEFAULT_AGE: u16 = 30;

/// Tolerance for belt speed comparisons.
const SPEED_EPSILON: f32 = 1e-3;

/// Outcome of one feedback decision cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Speed was raised to the contained value
    Increased(f32),
    /// Speed was lowered to the contained value
    Decreased(f32),
    /// No change this cycle
    Hold,
}

/// Closed-loop workout session controller.
///
/// Exclusively owned by one driver (thread or task); commands arriving
/// through it are therefore serialized and never race a tick.
pub struct SessionController {
    state: SessionState,
    session_id: Option<Uuid>,
    max_hr: u16,
    zone_selection: Option<ZoneSelection>,
    target: Option<ZoneBounds>,
    speed_bounds: SpeedBounds,
    current_speed_kmh: f32,
    current_bpm: Option<u16>,
    source_connected: bool,
    elapsed_seconds: u32,
    distance_km: f64,
    heart_rate_series: TelemetryBuffer,
    speed_series: TelemetryBuffer,
    status: Option<StatusMessage>,
    actuator: Box<dyn SpeedActuator>,
    event_tx: Option<Sender<SessionEvent>>,
}

impl SessionController {
    /// Create a controller with default speed bounds and rider age.
    pub fn new(actuator: Box<dyn SpeedActuator>) -> Self {
        // DEFAULT_AGE is always a valid input to the formula
        let max_hr = zones::max_heart_rate(DEFAULT_AGE).unwrap_or(190);
        let speed_bounds = SpeedBounds::default();

        Self {
            state: SessionState::Idle,
            session_id: None,
            max_hr,
            zone_selection: None,
            target: None,
            current_speed_kmh: speed_bounds.min_kmh,
            speed_bounds,
            current_bpm: None,
            source_connected: false,
            elapsed_seconds: 0,
            distance_km: 0.0,
            heart_rate_series: TelemetryBuffer::new(),
            speed_series: TelemetryBuffer::new(),
            status: None,
            actuator,
            event_tx: None,
        }
    }

    /// Get an event receiver for session events.
    pub fn event_receiver(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = crossbeam::channel::unbounded();
        self.event_tx = Some(tx);
        rx
    }

    /// Send an event if the channel is available.
    fn send_event(&self, event: SessionEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Report a rejected command through the event channel.
    ///
    /// Rejections never alter state; they are surfaced for the UI.
    pub fn report_rejected(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Command rejected: {}", reason);
        self.send_event(SessionEvent::CommandRejected(reason));
    }

    /// Post a transient status message.
    fn show_status(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{}", text);
        self.send_event(SessionEvent::Status(text.clone()));
        self.status = Some(StatusMessage::new(text));
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::info!("Session state: {} -> {}", self.state, state);
            self.state = state;
            self.send_event(SessionEvent::StateChanged(state));
        }
    }

    /// Command the actuator and record the applied speed.
    fn apply_speed(&mut self, kmh: f32) -> Result<f32, SessionError> {
        let applied = self.actuator.set_speed(kmh)?;
        self.current_speed_kmh = applied;
        self.send_event(SessionEvent::SpeedChanged(applied));
        Ok(applied)
    }

    // --- Configuration commands -------------------------------------------

    /// Set the rider's age, recomputing max heart rate.
    ///
    /// A named-zone target is re-resolved against the new max HR; a custom
    /// range is left alone.
    pub fn set_age(&mut self, age: u16) -> Result<(), SessionError> {
        self.max_hr = zones::max_heart_rate(age)?;

        if let Some(ZoneSelection::NamedZone(index)) = self.zone_selection {
            self.target = Some(zones::target_bounds(
                ZoneSelection::NamedZone(index),
                self.max_hr,
            )?);
        }

        tracing::debug!("Max heart rate set to {} (age {})", self.max_hr, age);
        Ok(())
    }

    /// Select a named target zone (1-5), clearing any custom range.
    pub fn select_zone(&mut self, index: u8) -> Result<(), SessionError> {
        let selection = ZoneSelection::NamedZone(index);
        let bounds = zones::target_bounds(selection, self.max_hr)?;

        self.zone_selection = Some(selection);
        self.target = Some(bounds);
        self.show_status(format!(
            "Target set to Zone {} ({}-{} BPM)",
            index, bounds.min_bpm, bounds.max_bpm
        ));
        Ok(())
    }

    /// Set a custom BPM target range, clearing any named zone.
    pub fn set_custom_range(&mut self, min_bpm: u16, max_bpm: u16) -> Result<(), SessionError> {
        let selection = ZoneSelection::Custom { min_bpm, max_bpm };
        let bounds = zones::target_bounds(selection, self.max_hr)?;

        self.zone_selection = Some(selection);
        self.target = Some(bounds);
        self.show_status(format!(
            "Target set to custom range ({}-{} BPM)",
            min_bpm, max_bpm
        ));
        Ok(())
    }

    /// Replace the speed bounds, re-clamping the current speed into range.
    pub fn set_speed_bounds(&mut self, bounds: SpeedBounds) -> Result<(), SessionError> {
        bounds.validate()?;
        self.speed_bounds = bounds;

        let clamped = self.current_speed_kmh.clamp(bounds.min_kmh, bounds.max_kmh);
        if (clamped - self.current_speed_kmh).abs() > SPEED_EPSILON {
            if self.state == SessionState::Idle || !self.actuator.is_connected() {
                self.current_speed_kmh = clamped;
            } else if let Err(e) = self.apply_speed(clamped) {
                self.current_speed_kmh = clamped;
                self.show_status(format!("Speed command failed: {e}"));
            }
        }
        Ok(())
    }

    /// Record whether the sample source connection is live.
    ///
    /// On disconnect the last reading is held unchanged; "no new sample" is
    /// not an error for the control loop.
    pub fn set_source_connected(&mut self, connected: bool) {
        if self.source_connected && !connected {
            self.show_status("Heart rate source disconnected");
        }
        self.source_connected = connected;
    }

    // --- Session lifecycle --------------------------------------------------

    /// Start a session.
    ///
    /// Valid from `Idle`, or from `Stopping` where it cancels the in-flight
    /// ramp-down. Resets accumulators and telemetry and puts the belt at
    /// minimum speed.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Stopping => {}
            other => {
                return Err(SessionError::PreconditionFailed(format!(
                    "cannot start while {other}"
                )))
            }
        }
        if !self.source_connected || !self.actuator.is_connected() {
            return Err(SessionError::PreconditionFailed(
                "connect both devices before starting".to_string(),
            ));
        }
        if self.target.is_none() {
            return Err(SessionError::PreconditionFailed(
                "select a target heart rate zone or set custom values".to_string(),
            ));
        }

        // Belt to minimum before the state flips; a failed command leaves
        // the controller exactly where it was.
        self.apply_speed(self.speed_bounds.min_kmh)?;

        self.session_id = Some(Uuid::new_v4());
        self.elapsed_seconds = 0;
        self.distance_km = 0.0;
        self.heart_rate_series.clear();
        self.speed_series.clear();

        self.set_state(SessionState::Active);
        self.show_status("Workout started!");
        Ok(())
    }

    /// Pause the active session. Accumulators and the feedback policy
    /// freeze; the belt speed and heart-rate sampling continue.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::PreconditionFailed(format!(
                "cannot pause while {}",
                self.state
            )));
        }
        self.set_state(SessionState::Paused);
        self.show_status("Workout paused");
        Ok(())
    }

    /// Resume a paused session without resetting accumulators.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Paused {
            return Err(SessionError::PreconditionFailed(format!(
                "cannot resume while {}",
                self.state
            )));
        }
        self.set_state(SessionState::Active);
        self.show_status("Workout resumed");
        Ok(())
    }

    /// Stop the session, beginning the ramp-down to minimum speed.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active | SessionState::Paused => {}
            other => {
                return Err(SessionError::PreconditionFailed(format!(
                    "cannot stop while {other}"
                )))
            }
        }
        self.set_state(SessionState::Stopping);
        self.show_status("Workout complete, slowing down");
        Ok(())
    }

    /// Take one ramp-down step. Called once per second while `Stopping`.
    ///
    /// Returns `true` once the belt is at minimum speed and the session has
    /// returned to `Idle`.
    pub fn ramp_step(&mut self) -> Result<bool, SessionError> {
        if self.state != SessionState::Stopping {
            return Err(SessionError::PreconditionFailed(format!(
                "no ramp-down while {}",
                self.state
            )));
        }

        let min = self.speed_bounds.min_kmh;
        if self.current_speed_kmh > min + SPEED_EPSILON {
            let next = (self.current_speed_kmh - self.speed_bounds.step_kmh).max(min);
            if let Err(e) = self.apply_speed(next) {
                // Speed unchanged, retried on the next step
                self.show_status(format!("Speed command failed: {e}"));
                return Ok(false);
            }
        }

        if self.current_speed_kmh <= min + SPEED_EPSILON {
            self.set_state(SessionState::Idle);
            self.show_status("Workout completed!");
            return Ok(true);
        }
        Ok(false)
    }

    // --- Tick processing ----------------------------------------------------

    /// Ingest a heart-rate sample.
    ///
    /// Updates the current reading and the display history regardless of
    /// session state; samples only drive speed at decision time.
    pub fn ingest_sample(&mut self, sample: HeartRateSample) {
        self.current_bpm = Some(sample.bpm);
        self.heart_rate_series.push(TelemetryPoint {
            elapsed_seconds: self.elapsed_seconds,
            value: Some(sample.bpm as f32),
        });
    }

    /// Advance the session by one second.
    ///
    /// No time or distance accumulates unless the session is `Active`.
    pub fn tick(&mut self) {
        if self.state != SessionState::Active {
            return;
        }

        self.elapsed_seconds += 1;
        self.distance_km += self.current_speed_kmh as f64 / 3600.0;
        self.speed_series.push(TelemetryPoint {
            elapsed_seconds: self.elapsed_seconds,
            value: Some(self.current_speed_kmh),
        });
    }

    /// Run one feedback decision cycle.
    ///
    /// Bounded-step hysteresis: one `step_kmh` toward the target band per
    /// cycle, never outside `[min_kmh, max_kmh]`. Runs on a coarser cadence
    /// than sampling so single noisy readings cannot oscillate the belt.
    /// An actuator failure leaves the speed unchanged for this cycle.
    pub fn decide(&mut self) -> Decision {
        if self.state != SessionState::Active {
            return Decision::Hold;
        }
        let (Some(bpm), Some(target)) = (self.current_bpm, self.target) else {
            return Decision::Hold;
        };

        let bounds = self.speed_bounds;
        if bpm < target.min_bpm && self.current_speed_kmh < bounds.max_kmh - SPEED_EPSILON {
            let next = (self.current_speed_kmh + bounds.step_kmh).min(bounds.max_kmh);
            match self.apply_speed(next) {
                Ok(applied) => {
                    self.show_status("Increasing speed to raise heart rate");
                    Decision::Increased(applied)
                }
                Err(e) => {
                    tracing::warn!("Feedback speed increase failed: {}", e);
                    self.show_status(format!("Speed command failed: {e}"));
                    Decision::Hold
                }
            }
        } else if bpm > target.max_bpm && self.current_speed_kmh > bounds.min_kmh + SPEED_EPSILON {
            let next = (self.current_speed_kmh - bounds.step_kmh).max(bounds.min_kmh);
            match self.apply_speed(next) {
                Ok(applied) => {
                    self.show_status("Decreasing speed to lower heart rate");
                    Decision::Decreased(applied)
                }
                Err(e) => {
                    tracing::warn!("Feedback speed decrease failed: {}", e);
                    self.show_status(format!("Speed command failed: {e}"));
                    Decision::Hold
                }
            }
        } else {
            Decision::Hold
        }
    }

    /// Apply an advisory recommendation out of band.
    ///
    /// Same clamping as the feedback policy but with the advisor's amount
    /// instead of the fixed step. Only valid while `Active`.
    pub fn apply_recommendation(
        &mut self,
        action: crate::advisor::RecommendedAction,
        amount_kmh: f32,
    ) -> Result<(), SessionError> {
        use crate::advisor::RecommendedAction;

        if self.state != SessionState::Active {
            return Err(SessionError::PreconditionFailed(
                "recommendations apply only to an active session".to_string(),
            ));
        }
        if !amount_kmh.is_finite() || amount_kmh < 0.0 {
            return Err(SessionError::InvalidInput(format!(
                "recommendation amount {amount_kmh} must be non-negative"
            )));
        }

        match action {
            RecommendedAction::Increase => {
                let next = (self.current_speed_kmh + amount_kmh).min(self.speed_bounds.max_kmh);
                let applied = self.apply_speed(next)?;
                self.show_status(format!("Advisor increased speed to {applied:.1} km/h"));
            }
            RecommendedAction::Decrease => {
                let next = (self.current_speed_kmh - amount_kmh).max(self.speed_bounds.min_kmh);
                let applied = self.apply_speed(next)?;
                self.show_status(format!("Advisor decreased speed to {applied:.1} km/h"));
            }
            RecommendedAction::Maintain => {}
        }
        Ok(())
    }

    // --- Accessors ----------------------------------------------------------

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Currently commanded belt speed in km/h.
    pub fn current_speed(&self) -> f32 {
        self.current_speed_kmh
    }

    /// Latest heart-rate reading.
    pub fn current_bpm(&self) -> Option<u16> {
        self.current_bpm
    }

    /// Zone the latest reading falls into.
    pub fn current_zone(&self) -> Option<u8> {
        self.current_bpm
            .and_then(|bpm| zones::current_zone(bpm, self.max_hr))
    }

    /// Seconds of active session time.
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    /// Accumulated distance in km.
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// Configured max heart rate.
    pub fn max_heart_rate(&self) -> u16 {
        self.max_hr
    }

    /// Resolved target range, if one is set.
    pub fn target_bounds(&self) -> Option<ZoneBounds> {
        self.target
    }

    /// Current zone selection.
    pub fn zone_selection(&self) -> Option<ZoneSelection> {
        self.zone_selection
    }

    /// Configured speed envelope.
    pub fn speed_bounds(&self) -> SpeedBounds {
        self.speed_bounds
    }

    /// Unexpired status message, if any.
    pub fn status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|m| !m.is_expired())
            .map(|m| m.text.as_str())
    }

    /// Point-in-time copy of the session for display.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            state: self.state,
            current_bpm: self.current_bpm,
            current_zone: self.current_zone(),
            current_speed_kmh: self.current_speed_kmh,
            target: self.target,
            speed_bounds: self.speed_bounds,
            elapsed_seconds: self.elapsed_seconds,
            distance_km: self.distance_km,
            calories: estimate_calories(
                self.elapsed_seconds,
                self.current_speed_kmh,
                self.current_bpm,
            ),
            heart_rate: self.heart_rate_series.snapshot(),
            speed: self.speed_series.snapshot(),
            status: self.status().map(str::to_string),
        }
    }
}
