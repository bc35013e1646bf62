//! Heart rate zone calculations.
//!
//! Pure zone math: maximum heart rate from age, the five-zone table as
//! fractions of max HR, target range resolution, and classification of a
//! live reading into a zone.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fractional zone boundaries as a share of max heart rate.
///
/// Zone i (1-indexed) spans `[ZONE_FRACTIONS[i-1], ZONE_FRACTIONS[i])`.
pub const ZONE_FRACTIONS: [f32; 6] = [0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Number of named zones.
pub const ZONE_COUNT: u8 = 5;

/// RGB color representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Display colors for zones 1-5.
pub const ZONE_COLORS: [Color; 5] = [
    Color::new(128, 128, 128), // Z1: Gray (Recovery)
    Color::new(0, 128, 255),   // Z2: Blue (Endurance)
    Color::new(0, 200, 100),   // Z3: Green (Aerobic)
    Color::new(255, 200, 0),   // Z4: Yellow (Threshold)
    Color::new(255, 50, 50),   // Z5: Red (Maximum)
];

/// Display labels for zones 1-5.
pub const ZONE_LABELS: [&str; 5] = [
    "Recovery",
    "Endurance",
    "Aerobic",
    "Threshold",
    "Maximum",
];

/// An absolute BPM target range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneBounds {
    /// Lower bound in BPM (inclusive)
    pub min_bpm: u16,
    /// Upper bound in BPM (exclusive for classification)
    pub max_bpm: u16,
}

/// How the user selected their target range.
///
/// A named zone and a custom range are mutually exclusive; setting one
/// clears the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSelection {
    /// One of the five named zones (1-5)
    NamedZone(u8),
    /// An explicit BPM range
    Custom { min_bpm: u16, max_bpm: u16 },
}

/// Errors from zone calculations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneError {
    /// Age outside the physiological bound
    #[error("invalid age {0}: expected 1-119")]
    InvalidInput(u16),

    /// Custom range with min >= max
    #[error("invalid custom range: {min} >= {max}")]
    InvalidRange { min: u16, max: u16 },

    /// Named zone index outside 1-5
    #[error("zone index {0} out of range (1-5)")]
    OutOfRange(u8),
}

/// Calculate maximum heart rate from age using the 220-minus-age formula.
pub fn max_heart_rate(age: u16) -> Result<u16, ZoneError> {
    if age == 0 || age >= 120 {
        return Err(ZoneError::InvalidInput(age));
    }
    Ok(220 - age)
}

/// Build the five-zone table for a given max heart rate.
///
/// Zones are contiguous and non-overlapping: each boundary is rounded once
/// and shared between the zone below and the zone above.
pub fn zone_table(max_hr: u16) -> [ZoneBounds; 5] {
    let mut boundaries = [0u16; 6];
    for (i, fraction) in ZONE_FRACTIONS.iter().enumerate() {
        boundaries[i] = (max_hr as f32 * fraction).round() as u16;
    }

    let mut zones = [ZoneBounds { min_bpm: 0, max_bpm: 0 }; 5];
    for (i, zone) in zones.iter_mut().enumerate() {
        *zone = ZoneBounds {
            min_bpm: boundaries[i],
            max_bpm: boundaries[i + 1],
        };
    }
    zones
}

/// Resolve a zone selection into absolute BPM bounds.
pub fn target_bounds(selection: ZoneSelection, max_hr: u16) -> Result<ZoneBounds, ZoneError> {
    match selection {
        ZoneSelection::NamedZone(index) => {
            if !(1..=ZONE_COUNT).contains(&index) {
                return Err(ZoneError::OutOfRange(index));
            }
            Ok(zone_table(max_hr)[(index - 1) as usize])
        }
        ZoneSelection::Custom { min_bpm, max_bpm } => {
            if min_bpm >= max_bpm {
                return Err(ZoneError::InvalidRange {
                    min: min_bpm,
                    max: max_bpm,
                });
            }
            Ok(ZoneBounds { min_bpm, max_bpm })
        }
    }
}

/// Classify a heart rate reading into a zone (1-5).
///
/// Returns `None` below zone 1's lower bound or at/above max HR. Intervals
/// are half-open, so a reading exactly on a boundary belongs to the zone
/// above it.
pub fn current_zone(bpm: u16, max_hr: u16) -> Option<u8> {
    if max_hr == 0 {
        return None;
    }

    let table = zone_table(max_hr);
    for (i, zone) in table.iter().enumerate() {
        if bpm >= zone.min_bpm && bpm < zone.max_bpm {
            return Some(i as u8 + 1);
        }
    }
    None
}

/// Display label for a zone index (1-5).
pub fn zone_label(index: u8) -> Option<&'static str> {
    if (1..=ZONE_COUNT).contains(&index) {
        Some(ZONE_LABELS[(index - 1) as usize])
    } else {
        None
    }
}

/// Display color for a zone index (1-5).
pub fn zone_color(index: u8) -> Option<Color> {
    if (1..=ZONE_COUNT).contains(&index) {
        Some(ZONE_COLORS[(index - 1) as usize])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_heart_rate_formula() {
        assert_eq!(max_heart_rate(30), Ok(190));
        assert_eq!(max_heart_rate(1), Ok(219));
        assert_eq!(max_heart_rate(119), Ok(101));
    }

    #[test]
    fn test_max_heart_rate_rejects_invalid_age() {
        assert_eq!(max_heart_rate(0), Err(ZoneError::InvalidInput(0)));
        assert_eq!(max_heart_rate(120), Err(ZoneError::InvalidInput(120)));
        assert_eq!(max_heart_rate(200), Err(ZoneError::InvalidInput(200)));
    }

    #[test]
    fn test_zone_table_contiguous_and_ordered() {
        for max_hr in [101u16, 150, 185, 190, 219] {
            let table = zone_table(max_hr);
            for zone in &table {
                assert!(zone.min_bpm < zone.max_bpm, "max_hr={max_hr}");
            }
            for pair in table.windows(2) {
                assert_eq!(pair[0].max_bpm, pair[1].min_bpm, "max_hr={max_hr}");
            }
            assert_eq!(table[4].max_bpm, max_hr);
        }
    }

    #[test]
    fn test_zone_table_values() {
        // Max HR 190 (age 30): Z1 = 95-114, Z5 = 171-190
        let table = zone_table(190);
        assert_eq!(table[0], ZoneBounds { min_bpm: 95, max_bpm: 114 });
        assert_eq!(table[4], ZoneBounds { min_bpm: 171, max_bpm: 190 });
    }

    #[test]
    fn test_target_bounds_named_zone() {
        let bounds = target_bounds(ZoneSelection::NamedZone(2), 190).unwrap();
        assert_eq!(bounds, ZoneBounds { min_bpm: 114, max_bpm: 133 });

        assert_eq!(
            target_bounds(ZoneSelection::NamedZone(0), 190),
            Err(ZoneError::OutOfRange(0))
        );
        assert_eq!(
            target_bounds(ZoneSelection::NamedZone(6), 190),
            Err(ZoneError::OutOfRange(6))
        );
    }

    #[test]
    fn test_target_bounds_custom() {
        let bounds = target_bounds(
            ZoneSelection::Custom { min_bpm: 100, max_bpm: 150 },
            190,
        )
        .unwrap();
        assert_eq!(bounds, ZoneBounds { min_bpm: 100, max_bpm: 150 });

        assert_eq!(
            target_bounds(ZoneSelection::Custom { min_bpm: 150, max_bpm: 100 }, 190),
            Err(ZoneError::InvalidRange { min: 150, max: 100 })
        );
        assert_eq!(
            target_bounds(ZoneSelection::Custom { min_bpm: 120, max_bpm: 120 }, 190),
            Err(ZoneError::InvalidRange { min: 120, max: 120 })
        );
    }

    #[test]
    fn test_current_zone_classification() {
        // Max HR 190: boundaries at 95, 114, 133, 152, 171, 190
        assert_eq!(current_zone(94, 190), None); // Below zone 1
        assert_eq!(current_zone(95, 190), Some(1));
        assert_eq!(current_zone(113, 190), Some(1));
        assert_eq!(current_zone(114, 190), Some(2)); // Boundary goes up
        assert_eq!(current_zone(160, 190), Some(4));
        assert_eq!(current_zone(189, 190), Some(5));
        assert_eq!(current_zone(190, 190), None); // At max HR
        assert_eq!(current_zone(250, 190), None);
    }

    #[test]
    fn test_zone_labels_and_colors() {
        assert_eq!(zone_label(1), Some("Recovery"));
        assert_eq!(zone_label(5), Some("Maximum"));
        assert_eq!(zone_label(6), None);
        assert_eq!(zone_color(3), Some(Color::new(0, 200, 100)));
        assert_eq!(zone_color(0), None);
    }
}
