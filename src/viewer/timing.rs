//! Frame time averaging for the window title.

use std::time::Instant;

/// Weight of the newest sample in the moving average.
const SMOOTHING: f64 = 0.2;

/// Exponential moving average of frame times, in milliseconds.
#[derive(Debug, Default, Clone)]
pub struct FrameTiming {
    last: Option<Instant>,
    average_ms: Option<f64>,
}

impl FrameTiming {
    /// Record a frame boundary. Returns the updated average once two frames
    /// have been seen.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let last = self.last.replace(now)?;
        let ms = now.duration_since(last).as_secs_f64() * 1000.0;
        let avg = match self.average_ms {
            None => ms,
            Some(prev) => (1.0 - SMOOTHING) * prev + SMOOTHING * ms,
        };
        self.average_ms = Some(avg);
        Some(avg)
    }

    pub fn title(average_ms: f64) -> String {
        let fps = if average_ms > 0.0 { 1000.0 / average_ms } else { 0.0 };
        format!("wavefront  {average_ms:.2} ms / {fps:.1} fps")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_tick_has_no_average() {
        let mut t = FrameTiming::default();
        assert_eq!(t.tick(Instant::now()), None);
    }

    #[test]
    fn test_moving_average() {
        let mut t = FrameTiming::default();
        let t0 = Instant::now();
        t.tick(t0);
        let a = t.tick(t0 + Duration::from_millis(10)).unwrap();
        assert!((a - 10.0).abs() < 1e-6);
        let b = t.tick(t0 + Duration::from_millis(30)).unwrap();
        assert!((b - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_title() {
        assert_eq!(FrameTiming::title(10.0), "wavefront  10.00 ms / 100.0 fps");
    }
}
