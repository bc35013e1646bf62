//! Fixed-capacity telemetry rings for the live charts.

use std::collections::VecDeque;

/// Number of points each ring holds (one per second, a minute of history).
pub const TELEMETRY_CAPACITY: usize = 60;

/// One display point on a telemetry chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryPoint {
    /// Session-relative second the point was recorded at
    pub elapsed_seconds: u32,
    /// The recorded value, `None` when the signal had no reading
    pub value: Option<f32>,
}

/// Append-only ring of telemetry points with oldest-first eviction.
///
/// Display-only history; control decisions never read from it.
#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    points: VecDeque<TelemetryPoint>,
    capacity: usize,
}

impl TelemetryBuffer {
    /// Create a ring with the default one-minute capacity.
    pub fn new() -> Self {
        Self::with_capacity(TELEMETRY_CAPACITY)
    }

    /// Create a ring with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when full.
    pub fn push(&mut self, point: TelemetryPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Copy of the buffered points in chronological order.
    pub fn snapshot(&self) -> Vec<TelemetryPoint> {
        self.points.iter().copied().collect()
    }

    /// Number of buffered points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop all points.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(second: u32, value: f32) -> TelemetryPoint {
        TelemetryPoint {
            elapsed_seconds: second,
            value: Some(value),
        }
    }

    #[test]
    fn test_push_and_snapshot_ordering() {
        let mut buffer = TelemetryBuffer::new();
        buffer.push(point(0, 120.0));
        buffer.push(point(1, 121.0));
        buffer.push(point(2, 122.0));

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].elapsed_seconds, 0);
        assert_eq!(snapshot[2].elapsed_seconds, 2);
    }

    #[test]
    fn test_eviction_discards_oldest() {
        let mut buffer = TelemetryBuffer::new();
        for second in 0..61 {
            buffer.push(point(second, second as f32));
        }

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), TELEMETRY_CAPACITY);
        assert_eq!(snapshot.first().unwrap().elapsed_seconds, 1);
        assert_eq!(snapshot.last().unwrap().elapsed_seconds, 60);

        // Still strictly chronological after wrapping
        for pair in snapshot.windows(2) {
            assert!(pair[0].elapsed_seconds < pair[1].elapsed_seconds);
        }
    }

    #[test]
    fn test_clear() {
        let mut buffer = TelemetryBuffer::new();
        buffer.push(point(0, 1.0));
        assert!(!buffer.is_empty());

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.snapshot().len(), 0);
    }

    #[test]
    fn test_missing_values_are_preserved() {
        let mut buffer = TelemetryBuffer::new();
        buffer.push(TelemetryPoint {
            elapsed_seconds: 0,
            value: None,
        });
        assert_eq!(buffer.snapshot()[0].value, None);
    }
}
