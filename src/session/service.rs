//! Session worker task.
//!
//! One tokio task owns the [`SessionController`] exclusively. Callers talk
//! to it through a command channel and listen on the controller's event
//! channel, so configuration changes are serialized with ticks and no state
//! is ever shared across threads. Sampling, feedback decisions, and the
//! stop ramp-down run as three timers inside the same select loop; the
//! state guards on the decision and ramp branches act as their cancellation.

use crate::advisor::Recommendation;
use crate::devices::types::SourceEvent;
use crate::session::controller::SessionController;
use crate::session::types::{SessionSnapshot, SessionState, SpeedBounds};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Commands accepted by the session worker.
#[derive(Debug)]
pub enum SessionCommand {
    /// Start a session
    Start,
    /// Pause the active session
    Pause,
    /// Resume the paused session
    Resume,
    /// Stop the session and ramp down
    Stop,
    /// Select a named target zone (1-5)
    SelectZone(u8),
    /// Set a custom BPM target range
    SetCustomRange { min_bpm: u16, max_bpm: u16 },
    /// Replace the speed bounds
    SetSpeedBounds(SpeedBounds),
    /// Set the rider's age
    SetAge(u16),
    /// Apply an advisory recommendation
    ApplyRecommendation(Recommendation),
    /// Reply with a point-in-time session snapshot
    Snapshot(oneshot::Sender<SessionSnapshot>),
    /// Stop the worker task
    Shutdown,
}

/// Timer cadences of the worker loop.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// Sampling tick period (nominal 1 s)
    pub sample_interval: Duration,
    /// Feedback decision period (nominal 3 s, coarser than sampling)
    pub decision_interval: Duration,
    /// Ramp-down step period (nominal 1 s)
    pub ramp_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(1),
            decision_interval: Duration::from_secs(3),
            ramp_interval: Duration::from_secs(1),
        }
    }
}

/// Handle to a running session worker.
///
/// Take the controller's event receiver before spawning; the worker only
/// consumes commands and sample events.
pub struct SessionService {
    command_tx: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionService {
    /// Spawn the worker task that owns the controller.
    pub fn spawn(
        controller: SessionController,
        samples: mpsc::UnboundedReceiver<SourceEvent>,
        config: ServiceConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);
        let task = tokio::spawn(run(controller, command_rx, samples, config));

        Self { command_tx, task }
    }

    /// Sender for issuing commands from elsewhere.
    pub fn commands(&self) -> mpsc::Sender<SessionCommand> {
        self.command_tx.clone()
    }

    /// Send a command, returning whether the worker is still alive.
    pub async fn send(&self, command: SessionCommand) -> bool {
        self.command_tx.send(command).await.is_ok()
    }

    /// Request a point-in-time snapshot of the session.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(SessionCommand::Snapshot(tx)).await.is_err() {
            return None;
        }
        rx.await.ok()
    }

    /// Shut the worker down and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Worker loop: serializes commands, sample events, and the three timers.
async fn run(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut samples: mpsc::UnboundedReceiver<SourceEvent>,
    config: ServiceConfig,
) {
    let mut sample_tick = tokio::time::interval(config.sample_interval);
    let mut decision_tick = tokio::time::interval(config.decision_interval);
    let mut ramp_tick = tokio::time::interval(config.ramp_interval);
    sample_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    decision_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ramp_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut samples_open = true;

    tracing::info!("Session worker started");

    loop {
        let state = controller.state();

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                if matches!(command, SessionCommand::Shutdown) {
                    break;
                }

                let before = controller.state();
                apply_command(&mut controller, command);
                let after = controller.state();

                if before != after {
                    // Fresh cadence whenever a timer's state becomes live,
                    // so a pending immediate tick cannot fire early
                    match after {
                        SessionState::Active => decision_tick.reset(),
                        SessionState::Stopping => ramp_tick.reset(),
                        _ => {}
                    }
                }
            }

            event = samples.recv(), if samples_open => {
                match event {
                    Some(SourceEvent::Sample(sample)) => controller.ingest_sample(sample),
                    Some(SourceEvent::Disconnected) => controller.set_source_connected(false),
                    None => {
                        controller.set_source_connected(false);
                        samples_open = false;
                    }
                }
            }

            _ = sample_tick.tick() => {
                controller.tick();
            }

            _ = decision_tick.tick(), if state == SessionState::Active => {
                controller.decide();
            }

            _ = ramp_tick.tick(), if state == SessionState::Stopping => {
                if let Ok(true) = controller.ramp_step() {
                    tracing::debug!("Ramp-down complete");
                }
            }
        }
    }

    tracing::info!("Session worker stopped");
}

/// Apply one command, reporting failures without touching state.
fn apply_command(controller: &mut SessionController, command: SessionCommand) {
    let result = match command {
        SessionCommand::Start => controller.start(),
        SessionCommand::Pause => controller.pause(),
        SessionCommand::Resume => controller.resume(),
        SessionCommand::Stop => controller.stop(),
        SessionCommand::SelectZone(index) => controller.select_zone(index),
        SessionCommand::SetCustomRange { min_bpm, max_bpm } => {
            controller.set_custom_range(min_bpm, max_bpm)
        }
        SessionCommand::SetSpeedBounds(bounds) => controller.set_speed_bounds(bounds),
        SessionCommand::SetAge(age) => controller.set_age(age),
        SessionCommand::ApplyRecommendation(rec) => {
            controller.apply_recommendation(rec.action, rec.amount_kmh)
        }
        SessionCommand::Snapshot(reply) => {
            let _ = reply.send(controller.snapshot());
            Ok(())
        }
        // Handled by the loop
        SessionCommand::Shutdown => Ok(()),
    };

    if let Err(e) = result {
        controller.report_rejected(e.to_string());
    }
}
