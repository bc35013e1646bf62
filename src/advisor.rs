//! Advisory speed recommendations.
//!
//! Optional collaborator: an advisor looks at the live metrics and suggests
//! a one-off speed change with an arbitrary amount, which the controller
//! applies with the same clamping as the feedback policy. The session is
//! fully functional without one.

use crate::session::types::SpeedBounds;
use crate::zones::ZoneBounds;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suggested direction of a speed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedAction {
    /// Raise the belt speed
    Increase,
    /// Lower the belt speed
    Decrease,
    /// Leave the belt speed alone
    Maintain,
}

/// A speed change suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Suggested direction
    pub action: RecommendedAction,
    /// Suggested change in km/h
    #[serde(rename = "amount")]
    pub amount_kmh: f32,
}

/// Live metrics an advisor analyzes.
#[derive(Debug, Clone, Copy)]
pub struct AdvisorInput {
    /// Latest heart-rate reading
    pub current_bpm: u16,
    /// Target BPM range
    pub target: ZoneBounds,
    /// Currently applied belt speed
    pub current_speed_kmh: f32,
    /// Configured speed envelope
    pub speed_bounds: SpeedBounds,
}

/// Errors from an advisor.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The advisor could not produce a recommendation
    #[error("advisor unavailable: {0}")]
    Unavailable(String),
}

/// Produces speed recommendations from live metrics.
pub trait Advisor: Send {
    /// Analyze the metrics and suggest a speed change.
    fn analyze(&self, input: &AdvisorInput) -> Result<Recommendation, AdvisorError>;
}

/// Maximum number of steps the heuristic advisor suggests at once.
const MAX_STEPS: f32 = 5.0;

/// BPM of deviation worth one extra step.
const BPM_PER_STEP: f32 = 10.0;

/// A local rule-based advisor.
///
/// Scales the suggested amount with how far the heart rate sits outside the
/// target band, in whole feedback steps, capped and clamped to what the
/// speed envelope can actually absorb.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAdvisor;

impl HeuristicAdvisor {
    fn scaled_amount(deviation_bpm: u16, step_kmh: f32, reachable_kmh: f32) -> f32 {
        let steps = (deviation_bpm as f32 / BPM_PER_STEP).ceil().clamp(1.0, MAX_STEPS);
        (steps * step_kmh).min(reachable_kmh)
    }
}

impl Advisor for HeuristicAdvisor {
    fn analyze(&self, input: &AdvisorInput) -> Result<Recommendation, AdvisorError> {
        let bounds = input.speed_bounds;

        let recommendation = if input.current_bpm < input.target.min_bpm {
            let deviation = input.target.min_bpm - input.current_bpm;
            let reachable = (bounds.max_kmh - input.current_speed_kmh).max(0.0);
            Recommendation {
                action: RecommendedAction::Increase,
                amount_kmh: Self::scaled_amount(deviation, bounds.step_kmh, reachable),
            }
        } else if input.current_bpm > input.target.max_bpm {
            let deviation = input.current_bpm - input.target.max_bpm;
            let reachable = (input.current_speed_kmh - bounds.min_kmh).max(0.0);
            Recommendation {
                action: RecommendedAction::Decrease,
                amount_kmh: Self::scaled_amount(deviation, bounds.step_kmh, reachable),
            }
        } else {
            Recommendation {
                action: RecommendedAction::Maintain,
                amount_kmh: 0.0,
            }
        };

        Ok(recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(bpm: u16, speed: f32) -> AdvisorInput {
        AdvisorInput {
            current_bpm: bpm,
            target: ZoneBounds { min_bpm: 100, max_bpm: 140 },
            current_speed_kmh: speed,
            speed_bounds: SpeedBounds::default(),
        }
    }

    #[test]
    fn test_maintain_inside_band() {
        let rec = HeuristicAdvisor.analyze(&input(120, 3.0)).unwrap();
        assert_eq!(rec.action, RecommendedAction::Maintain);
        assert_eq!(rec.amount_kmh, 0.0);
    }

    #[test]
    fn test_amount_scales_with_deviation() {
        let slight = HeuristicAdvisor.analyze(&input(95, 3.0)).unwrap();
        let large = HeuristicAdvisor.analyze(&input(60, 3.0)).unwrap();

        assert_eq!(slight.action, RecommendedAction::Increase);
        assert_eq!(large.action, RecommendedAction::Increase);
        assert!(large.amount_kmh > slight.amount_kmh);
    }

    #[test]
    fn test_amount_clamped_to_envelope() {
        // Far below the band but nearly at max speed already
        let rec = HeuristicAdvisor.analyze(&input(60, 4.9)).unwrap();
        assert_eq!(rec.action, RecommendedAction::Increase);
        assert!(rec.amount_kmh <= 0.1 + 1e-4);

        // Far above the band at minimum speed: nothing to give back
        let rec = HeuristicAdvisor.analyze(&input(190, 1.0)).unwrap();
        assert_eq!(rec.action, RecommendedAction::Decrease);
        assert_eq!(rec.amount_kmh, 0.0);
    }
}
