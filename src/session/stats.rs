//! Display helpers for session statistics.

/// Format elapsed seconds as MM:SS.
pub fn format_elapsed(seconds: u32) -> String {
    let minutes = seconds / 60;
    let remaining = seconds % 60;
    format!("{:02}:{:02}", minutes, remaining)
}

/// Rough calorie estimate from heart rate, speed, and duration.
///
/// Deliberately simple: heart rate sets the base burn rate and speed scales
/// it. A real figure would need weight, age, and sex.
pub fn estimate_calories(elapsed_seconds: u32, speed_kmh: f32, bpm: Option<u16>) -> u32 {
    let Some(bpm) = bpm else {
        return 0;
    };

    let minutes = elapsed_seconds as f32 / 60.0;
    let burn_rate = bpm as f32 * 0.1;
    let intensity = 1.0 + speed_kmh / 10.0;

    (burn_rate * intensity * minutes).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(59), "00:59");
        assert_eq!(format_elapsed(60), "01:00");
        assert_eq!(format_elapsed(3599), "59:59");
        assert_eq!(format_elapsed(3661), "61:01");
    }

    #[test]
    fn test_estimate_calories() {
        assert_eq!(estimate_calories(600, 5.0, None), 0);

        // 10 minutes at 120 bpm and 5 km/h: 12 * 1.5 * 10 = 180
        assert_eq!(estimate_calories(600, 5.0, Some(120)), 180);

        // Scales with duration
        let short = estimate_calories(60, 5.0, Some(120));
        let long = estimate_calories(120, 5.0, Some(120));
        assert!(long > short);
    }
}
