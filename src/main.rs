//! ZoneRun - Heart-Rate Zone Treadmill Training
//!
//! Headless entry point: runs a fully simulated session against the
//! controller, logging what a UI would display.

use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zonerun::advisor::{Advisor, AdvisorInput, HeuristicAdvisor};
use zonerun::devices::{SampleSource, SimulatedHeartRateSource, SimulatedTreadmill};
use zonerun::session::stats::format_elapsed;
use zonerun::{
    ServiceConfig, SessionCommand, SessionController, SessionService, SessionState, Settings,
};

/// How long the demo session runs before stopping.
const DEMO_ACTIVE_SECS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ZoneRun v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default settings: {}", e);
        Settings::default()
    });

    // Simulated devices standing in for the BLE adapters
    let mut treadmill = SimulatedTreadmill::new();
    treadmill.connect();

    let mut sensor = SimulatedHeartRateSource::new();
    let simulation = sensor.simulation_handle();
    sensor.connect();
    let samples = sensor.subscribe()?;

    let mut controller = SessionController::new(Box::new(treadmill));
    controller.set_source_connected(true);
    controller.set_age(settings.age)?;
    controller.set_speed_bounds(settings.speed_bounds)?;
    match settings.zone_selection {
        Some(zonerun::ZoneSelection::NamedZone(index)) => controller.select_zone(index)?,
        Some(zonerun::ZoneSelection::Custom { min_bpm, max_bpm }) => {
            controller.set_custom_range(min_bpm, max_bpm)?
        }
        None => controller.select_zone(2)?,
    }
    let events = controller.event_receiver();

    let service = SessionService::spawn(controller, samples, ServiceConfig::default());
    service.send(SessionCommand::Start).await;

    let advisor = HeuristicAdvisor;
    for second in 0..DEMO_ACTIVE_SECS {
        tokio::time::sleep(Duration::from_secs(1)).await;

        for event in events.try_iter() {
            tracing::debug!("Event: {:?}", event);
        }

        let Some(snapshot) = service.snapshot().await else {
            break;
        };

        // Feed live state back into the simulated sensor
        simulation.update(|input| {
            input.session_running = snapshot.state == SessionState::Active;
            input.speed_kmh = snapshot.current_speed_kmh;
            input.min_kmh = snapshot.speed_bounds.min_kmh;
            input.max_kmh = snapshot.speed_bounds.max_kmh;
            input.target_bpm = snapshot
                .target
                .map(|t| (t.min_bpm + t.max_bpm) / 2);
        });

        tracing::info!(
            "{} | {} | {:?} BPM (zone {:?}) | {:.1} km/h | {:.3} km | {} kcal",
            format_elapsed(snapshot.elapsed_seconds),
            snapshot.state,
            snapshot.current_bpm,
            snapshot.current_zone,
            snapshot.current_speed_kmh,
            snapshot.distance_km,
            snapshot.calories,
        );

        // Halfway in, ask the advisor for a one-off adjustment
        if second == DEMO_ACTIVE_SECS / 2 {
            if let (Some(bpm), Some(target)) = (snapshot.current_bpm, snapshot.target) {
                let input = AdvisorInput {
                    current_bpm: bpm,
                    target,
                    current_speed_kmh: snapshot.current_speed_kmh,
                    speed_bounds: snapshot.speed_bounds,
                };
                match advisor.analyze(&input) {
                    Ok(rec) => {
                        tracing::info!("Advisor suggests {:?} by {:.1} km/h", rec.action, rec.amount_kmh);
                        service.send(SessionCommand::ApplyRecommendation(rec)).await;
                    }
                    Err(e) => tracing::warn!("Advisor unavailable: {}", e),
                }
            }
        }
    }

    service.send(SessionCommand::Stop).await;

    // Wait out the ramp-down
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        match service.snapshot().await {
            Some(snapshot) if snapshot.state != SessionState::Idle => {
                tracing::info!("Ramping down: {:.1} km/h", snapshot.current_speed_kmh);
            }
            _ => break,
        }
    }

    service.shutdown().await;
    tracing::info!("Session finished");
    Ok(())
}
