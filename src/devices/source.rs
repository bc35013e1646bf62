//! Heart-rate sample source contract and simulated sensor.

use crate::devices::types::{ConnectionState, HeartRateSample, SourceError, SourceEvent};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Resting baseline of the simulated model in BPM.
const RESTING_BASE_BPM: u16 = 65;

/// Exercise baseline of the simulated model in BPM.
const EXERCISE_BASE_BPM: u16 = 70;

/// BPM added at full speed on top of the exercise baseline.
const EXERCISE_SPAN_BPM: f32 = 90.0;

/// Fraction of the gap to the target the model closes per sample.
const TARGET_PULL: f32 = 0.05;

/// Source of timestamped heart-rate readings.
///
/// Delivery is asynchronous at the sensor's native cadence. On disconnect
/// the adapter stops delivering samples and sends a final
/// [`SourceEvent::Disconnected`].
pub trait SampleSource: Send {
    /// Start sample delivery. Returns the receiving end of the event stream.
    fn subscribe(&mut self) -> Result<UnboundedReceiver<SourceEvent>, SourceError>;

    /// Stop sample delivery.
    fn unsubscribe(&mut self);

    /// Whether the sensor connection is live.
    fn is_connected(&self) -> bool;
}

/// Live workout state the simulated model reads on each sample.
#[derive(Debug, Clone, Copy)]
pub struct SimulationInput {
    /// Whether a session is actively running (not paused)
    pub session_running: bool,
    /// Current commanded speed in km/h
    pub speed_kmh: f32,
    /// Configured minimum speed in km/h
    pub min_kmh: f32,
    /// Configured maximum speed in km/h
    pub max_kmh: f32,
    /// Midpoint of the target zone, if one is set
    pub target_bpm: Option<u16>,
}

impl Default for SimulationInput {
    fn default() -> Self {
        Self {
            session_running: false,
            speed_kmh: 0.0,
            min_kmh: 1.0,
            max_kmh: 5.0,
            target_bpm: None,
        }
    }
}

/// Shared handle the driver uses to feed workout state into the simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulationHandle {
    input: Arc<Mutex<SimulationInput>>,
}

impl SimulationHandle {
    /// Update the simulation input.
    pub fn update(&self, f: impl FnOnce(&mut SimulationInput)) {
        let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut input);
    }

    fn read(&self) -> SimulationInput {
        *self.input.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Generate the next reading from the simulated model.
///
/// At rest the model idles near the resting baseline. While a session runs
/// it tracks the normalized belt speed, and when a target zone is set it
/// drifts a few percent toward the zone midpoint per sample, with a little
/// noise on top.
fn next_bpm(input: &SimulationInput, last_bpm: Option<u16>, rng: &mut impl Rng) -> u16 {
    let bpm = if input.session_running {
        match (input.target_bpm, last_bpm) {
            (Some(target), Some(last)) => {
                let pull = (target as f32 - last as f32) * TARGET_PULL;
                last as i32 + pull.round() as i32 + rng.gen_range(-1..=1)
            }
            _ => {
                let span = input.max_kmh - input.min_kmh;
                let speed_factor = if span > 0.0 {
                    ((input.speed_kmh - input.min_kmh) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                EXERCISE_BASE_BPM as i32
                    + (EXERCISE_SPAN_BPM * speed_factor).round() as i32
                    + rng.gen_range(-2..=2)
            }
        }
    } else {
        RESTING_BASE_BPM as i32 + rng.gen_range(0..5)
    };

    bpm.clamp(30, 220) as u16
}

/// An in-process heart-rate sensor producing samples at a fixed cadence.
pub struct SimulatedHeartRateSource {
    connection_state: ConnectionState,
    handle: SimulationHandle,
    sample_interval: Duration,
    event_tx: Option<UnboundedSender<SourceEvent>>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedHeartRateSource {
    /// Create a disconnected simulated sensor with a 1 Hz cadence.
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(1))
    }

    /// Create a simulated sensor with a custom sample cadence.
    pub fn with_interval(sample_interval: Duration) -> Self {
        Self {
            connection_state: ConnectionState::Disconnected,
            handle: SimulationHandle::default(),
            sample_interval,
            event_tx: None,
            task: None,
        }
    }

    /// Handle for feeding workout state into the simulation.
    pub fn simulation_handle(&self) -> SimulationHandle {
        self.handle.clone()
    }

    /// Establish the (simulated) connection.
    pub fn connect(&mut self) {
        self.connection_state = ConnectionState::Connected;
        tracing::info!("Simulated heart rate sensor connected");
    }

    /// Drop the connection, ending any active subscription.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.event_tx.take() {
            let _ = tx.send(SourceEvent::Disconnected);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.connection_state = ConnectionState::Disconnected;
        tracing::info!("Simulated heart rate sensor disconnected");
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }
}

impl Default for SimulatedHeartRateSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for SimulatedHeartRateSource {
    fn subscribe(&mut self) -> Result<UnboundedReceiver<SourceEvent>, SourceError> {
        if self.connection_state != ConnectionState::Connected {
            return Err(SourceError::NotConnected);
        }
        if self.task.is_some() {
            return Err(SourceError::AlreadySubscribed);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.handle.clone();
        let interval = self.sample_interval;
        let task_tx = tx.clone();

        self.event_tx = Some(tx);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut last_bpm: Option<u16> = None;

            loop {
                ticker.tick().await;

                let bpm = {
                    let mut rng = rand::thread_rng();
                    next_bpm(&handle.read(), last_bpm, &mut rng)
                };
                last_bpm = Some(bpm);

                if task_tx
                    .send(SourceEvent::Sample(HeartRateSample::now(bpm)))
                    .is_err()
                {
                    // Receiver dropped, subscription over
                    break;
                }
            }
        }));

        tracing::debug!("Heart rate subscription started");
        Ok(rx)
    }

    fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Heart rate subscription stopped");
        }
        self.event_tx = None;
    }

    fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resting_model_stays_near_baseline() {
        let input = SimulationInput::default();
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let bpm = next_bpm(&input, None, &mut rng);
            assert!((65..70).contains(&bpm), "resting bpm {bpm}");
        }
    }

    #[test]
    fn test_exercise_model_tracks_speed() {
        let mut rng = rand::thread_rng();
        let slow = SimulationInput {
            session_running: true,
            speed_kmh: 1.0,
            ..Default::default()
        };
        let fast = SimulationInput {
            session_running: true,
            speed_kmh: 5.0,
            ..Default::default()
        };

        let slow_bpm = next_bpm(&slow, None, &mut rng);
        let fast_bpm = next_bpm(&fast, None, &mut rng);
        assert!(slow_bpm < 80, "slow bpm {slow_bpm}");
        assert!(fast_bpm > 150, "fast bpm {fast_bpm}");
    }

    #[test]
    fn test_target_pull_converges() {
        let input = SimulationInput {
            session_running: true,
            target_bpm: Some(150),
            ..Default::default()
        };
        let mut rng = rand::thread_rng();

        let mut bpm = 80u16;
        for _ in 0..200 {
            bpm = next_bpm(&input, Some(bpm), &mut rng);
        }
        assert!((130..=170).contains(&bpm), "converged bpm {bpm}");
    }

    #[tokio::test]
    async fn test_subscription_delivers_samples() {
        let mut source = SimulatedHeartRateSource::with_interval(Duration::from_millis(5));
        assert!(matches!(
            source.subscribe(),
            Err(SourceError::NotConnected)
        ));

        source.connect();
        let mut rx = source.subscribe().unwrap();

        let event = rx.recv().await.expect("sample expected");
        assert!(matches!(event, SourceEvent::Sample(_)));

        source.unsubscribe();
    }

    #[tokio::test]
    async fn test_disconnect_ends_stream() {
        let mut source = SimulatedHeartRateSource::with_interval(Duration::from_millis(5));
        source.connect();
        let mut rx = source.subscribe().unwrap();

        let _ = rx.recv().await;
        source.disconnect();

        // Drain until the disconnect marker arrives
        loop {
            match rx.recv().await {
                Some(SourceEvent::Disconnected) => break,
                Some(SourceEvent::Sample(_)) => continue,
                None => panic!("stream closed without disconnect event"),
            }
        }
        assert!(!source.is_connected());
    }
}
