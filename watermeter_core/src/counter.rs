//! Odometer-style volume counter.

/// Accumulates registered volume and wraps back toward zero at its maximum.
///
/// Invariant: `0 <= accumulated < max` after every update.
#[derive(Debug, Clone)]
pub struct VolumeCounter {
    accumulated_m3: f64,
    max_m3: f64,
}

impl VolumeCounter {
    /// Creates an empty counter.
    ///
    /// The maximum is validated by [`crate::Meter::new`].
    pub fn new(max_m3: f64) -> Self {
        Self {
            accumulated_m3: 0.0,
            max_m3,
        }
    }

    /// Adds `delta_m3` to the counter.
    ///
    /// Non-positive deltas are ignored: a meter cannot run backwards.
    /// A single modulo handles deltas that wrap more than once.
    pub fn register_volume(&mut self, delta_m3: f64) {
        if delta_m3.is_nan() || delta_m3 <= 0.0 {
            return;
        }
        self.accumulated_m3 += delta_m3;
        if self.accumulated_m3 >= self.max_m3 {
            self.accumulated_m3 %= self.max_m3;
        }
    }

    pub fn current_volume(&self) -> f64 {
        self.accumulated_m3
    }

    pub fn max_volume(&self) -> f64 {
        self.max_m3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_rollover_near_max() {
        let mut counter = VolumeCounter::new(10.0);
        counter.register_volume(9.99);
        counter.register_volume(0.02);

        assert_relative_eq!(counter.current_volume(), 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_exact_max_wraps_to_zero() {
        let mut counter = VolumeCounter::new(10.0);
        counter.register_volume(10.0);
        assert_eq!(counter.current_volume(), 0.0);
    }

    #[test]
    fn test_multiple_wraps_in_one_delta() {
        let mut counter = VolumeCounter::new(10.0);
        counter.register_volume(1.0);
        counter.register_volume(35.5);

        assert_relative_eq!(counter.current_volume(), 6.5, epsilon = 1e-9);
    }

    #[test]
    fn test_reverse_and_zero_are_ignored() {
        let mut counter = VolumeCounter::new(10.0);
        counter.register_volume(3.0);
        counter.register_volume(0.0);
        counter.register_volume(-2.0);
        counter.register_volume(f64::NAN);

        assert_eq!(counter.current_volume(), 3.0);
    }

    proptest! {
        #[test]
        fn prop_counter_stays_in_range(
            max in 1e-3f64..1e4,
            deltas in prop::collection::vec(0.0f64..1e5, 0..64),
        ) {
            let mut counter = VolumeCounter::new(max);
            for delta in deltas {
                counter.register_volume(delta);
                let v = counter.current_volume();
                prop_assert!(v >= 0.0 && v < max, "volume {} escaped [0, {})", v, max);
            }
        }

        #[test]
        fn prop_non_positive_delta_is_noop(start in 0.0f64..9.0, delta in -1e6f64..=0.0) {
            let mut counter = VolumeCounter::new(10.0);
            counter.register_volume(start);
            let before = counter.current_volume();
            counter.register_volume(delta);
            prop_assert_eq!(counter.current_volume(), before);
        }
    }
}
