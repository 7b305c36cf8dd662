//! Probe interval jitter.

use std::time::Duration;
use rand::Rng;

/// Interval randomised within `ratio * interval`, centred on `interval`.
pub fn jittered_interval(interval: Duration, ratio: f64) -> Duration {
    let window = interval.mul_f64(ratio.clamp(0.0, 1.0));
    if window.is_zero() {
        return interval;
    }
    let offset: f64 = rand::thread_rng().gen_range(0.0..1.0);
    interval.saturating_sub(window / 2) + window.mul_f64(offset)
}

/// Delay before a candidate's first probe: a random point in the jitter window.
pub fn initial_delay(interval: Duration, ratio: f64) -> Duration {
    let window = interval.mul_f64(ratio.clamp(0.0, 1.0));
    if window.is_zero() {
        return Duration::ZERO;
    }
    window.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_window() {
        let interval = Duration::from_millis(1000);
        for _ in 0..200 {
            let d = jittered_interval(interval, 0.2);
            assert!(d >= Duration::from_millis(900));
            assert!(d < Duration::from_millis(1100));
        }
    }

    #[test]
    fn zero_ratio_is_exact() {
        let interval = Duration::from_millis(250);
        assert_eq!(jittered_interval(interval, 0.0), interval);
        assert_eq!(initial_delay(interval, 0.0), Duration::ZERO);
    }

    #[test]
    fn initial_delay_is_bounded() {
        for _ in 0..200 {
            assert!(initial_delay(Duration::from_secs(10), 0.1) < Duration::from_secs(1));
        }
    }
}
