//! Device adapter contracts and simulated implementations.
//!
//! The controller never talks to hardware directly: heart-rate input comes
//! through the [`SampleSource`] contract and treadmill commands go through
//! the [`SpeedActuator`] contract. Real transports (BLE and friends) live
//! behind the same traits in adapter crates; this crate ships simulated
//! implementations of both.

pub mod actuator;
pub mod source;
pub mod types;

pub use actuator::{SimulatedTreadmill, SpeedActuator};
pub use source::{SampleSource, SimulatedHeartRateSource, SimulationHandle};
pub use types::{ActuatorError, ConnectionState, HeartRateSample, SourceError, SourceEvent};
