//! ZoneRun - Heart-Rate Zone Treadmill Training
//!
//! A closed-loop workout controller that keeps the runner's heart rate
//! inside a target zone by issuing bounded speed adjustments to a treadmill.
//! Ships the session state machine, zone math, telemetry rings, device
//! adapter contracts with simulated implementations, and an optional
//! advisory recommendation hook.

pub mod advisor;
pub mod devices;
pub mod session;
pub mod storage;
pub mod zones;

// Re-export commonly used types
pub use advisor::{Advisor, HeuristicAdvisor, Recommendation, RecommendedAction};
pub use devices::{SampleSource, SimulatedHeartRateSource, SimulatedTreadmill, SpeedActuator};
pub use session::controller::SessionController;
pub use session::service::{ServiceConfig, SessionCommand, SessionService};
pub use session::types::{SessionEvent, SessionSnapshot, SessionState, SpeedBounds};
pub use storage::config::Settings;
pub use zones::{ZoneBounds, ZoneSelection};
