use std::time::{Duration, Instant};

/// Rounded percentage `done / total * 100`, clamped to 100.
///
/// An empty total counts as complete.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    // Round half up.
    let scaled = (u128::from(done) * 200 + u128::from(total)) / (2 * u128::from(total));
    scaled.min(100) as u8
}

/// Formats a byte count the way status lines show it (`"1.50 MB"`).
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

struct SpeedSample {
    bytes: u64,
    timestamp: Instant,
}

/// Calculates transfer speed using a sliding window of samples.
pub struct SpeedCalculator {
    samples: Vec<SpeedSample>,
    max_samples: usize,
    window_size: Duration,
}

impl SpeedCalculator {
    /// Creates a new calculator.
    ///
    /// - `window_size`: time window for speed calculation (default 5 s).
    /// - `max_samples`: maximum retained samples (default 100).
    pub fn new(window_size: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            samples: Vec::new(),
            max_samples: max_samples.unwrap_or(100),
            window_size: window_size.unwrap_or(Duration::from_secs(5)),
        }
    }

    /// Records `bytes` transferred at the current instant.
    pub fn add_sample(&mut self, bytes: u64) {
        self.add_sample_at(bytes, Instant::now());
    }

    fn add_sample_at(&mut self, bytes: u64, now: Instant) {
        self.samples.push(SpeedSample {
            bytes,
            timestamp: now,
        });

        if let Some(cutoff) = now.checked_sub(self.window_size) {
            self.samples.retain(|sample| sample.timestamp >= cutoff);
        }

        if self.samples.len() > self.max_samples {
            let excess = self.samples.len() - self.max_samples;
            self.samples.drain(..excess);
        }
    }

    /// Average speed in bytes/second within the window.
    ///
    /// Returns 0.0 with fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.first(), self.samples.last()) else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = last.timestamp.duration_since(first.timestamp);
        if elapsed.is_zero() {
            return 0.0;
        }

        // The first sample marks the window start; its bytes predate it.
        let total_bytes: u64 = self.samples[1..].iter().map(|sample| sample.bytes).sum();
        total_bytes as f64 / elapsed.as_secs_f64()
    }

    /// Estimates time remaining to transfer `remaining_bytes`.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes as f64 / speed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(0, 150_000), 0);
        assert_eq!(percent(65536, 150_000), 44); // 43.69
        assert_eq!(percent(131_072, 150_000), 87); // 87.38
        assert_eq!(percent(150_000, 150_000), 100);
        assert_eq!(percent(1, 200), 1); // 0.5 rounds up
        assert_eq!(percent(1, 201), 0);
    }

    #[test]
    fn percent_clamps_and_handles_empty() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(300, 100), 100);
        assert_eq!(percent(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn format_megabytes_two_decimals() {
        assert_eq!(format_megabytes(0), "0.00 MB");
        assert_eq!(format_megabytes(1024 * 1024 * 3 / 2), "1.50 MB");
    }

    #[test]
    fn speed_calculator_no_samples() {
        let calc = SpeedCalculator::new(None, None);
        assert_eq!(calc.bytes_per_second(), 0.0);
        assert!(calc.eta(1000).is_none());
    }

    #[test]
    fn speed_calculator_single_sample() {
        let mut calc = SpeedCalculator::new(None, None);
        calc.add_sample(100);
        assert_eq!(calc.bytes_per_second(), 0.0);
    }

    #[test]
    fn speed_calculator_multiple_samples() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(10)), None);
        let start = Instant::now();
        calc.add_sample_at(0, start);
        calc.add_sample_at(1000, start + Duration::from_millis(500));

        assert!((calc.bytes_per_second() - 2000.0).abs() < 1e-6);
        let eta = calc.eta(4000).unwrap();
        assert_eq!(eta, Duration::from_secs(2));
    }

    #[test]
    fn speed_calculator_drops_old_samples() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(1)), None);
        let start = Instant::now();
        calc.add_sample_at(500, start);
        calc.add_sample_at(500, start + Duration::from_secs(5));
        // Only the latest sample survives the window.
        assert_eq!(calc.bytes_per_second(), 0.0);
    }

    #[test]
    fn speed_calculator_max_samples() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(60)), Some(5));
        for i in 0..20 {
            calc.add_sample(i * 10);
        }
        assert!(calc.samples.len() <= 5);
    }
}
