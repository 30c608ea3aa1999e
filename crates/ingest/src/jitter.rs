use std::time::Duration;

use rand::Rng;

/// Source of the random component in pacing and flood-wait pauses.
/// Injectable so tests run with deterministic timing.
pub trait JitterSource: Send + Sync {
    /// Uniform duration in `[0, max]`.
    fn up_to(&self, max: Duration) -> Duration;

    /// Uniform duration in `[min, max]`.
    fn between(&self, min: Duration, max: Duration) -> Duration {
        min + self.up_to(max.saturating_sub(min))
    }
}

/// Thread-local RNG jitter, millisecond granularity.
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn up_to(&self, max: Duration) -> Duration {
        let max_ms = max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

/// No jitter. Deterministic pacing for tests.
pub struct ZeroJitter;

impl JitterSource for ZeroJitter {
    fn up_to(&self, _max: Duration) -> Duration {
        Duration::ZERO
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_rng_stays_in_bounds() {
        let jitter = ThreadRngJitter;
        let max = Duration::from_millis(50);
        for _ in 0..100 {
            assert!(jitter.up_to(max) <= max);
        }
    }

    #[test]
    fn between_respects_lower_bound() {
        let jitter = ThreadRngJitter;
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(200);
        for _ in 0..100 {
            let sample = jitter.between(min, max);
            assert!(sample >= min && sample <= max);
        }
    }

    #[test]
    fn zero_jitter_is_zero() {
        assert_eq!(ZeroJitter.up_to(Duration::from_secs(10)), Duration::ZERO);
        assert_eq!(
            ZeroJitter.between(Duration::from_secs(1), Duration::from_secs(2)),
            Duration::from_secs(1)
        );
    }
}
