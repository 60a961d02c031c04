//! Injectable randomness for the outage draws.

use crate::error::EnvError;
use rand::{Rng, RngCore};

/// A source of uniform draws in `[0, 1)`.
///
/// Any `rand` generator is a `RandomSource`; tests use [`ScriptedRandom`]
/// to force the outage-start and no-outage branches precisely.
pub trait RandomSource: Send {
    /// Returns the next uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl<R: RngCore + Send> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Replays a fixed list of draws, cycling once exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    /// Creates a scripted source. Every value must lie in `[0, 1)`.
    pub fn new(values: Vec<f64>) -> Result<Self, EnvError> {
        if values.is_empty() {
            return Err(EnvError::EmptyScript);
        }
        if let Some(bad) = values.iter().copied().find(|v| !(0.0..1.0).contains(v)) {
            return Err(EnvError::DrawOutOfRange(bad));
        }
        Ok(Self { values, cursor: 0 })
    }

    /// A source that always returns `value` (clamped just below 1.0).
    pub fn constant(value: f64) -> Self {
        let value = if value.is_finite() {
            value.clamp(0.0, 1.0 - f64::EPSILON)
        } else {
            0.0
        };
        Self {
            values: vec![value],
            cursor: 0,
        }
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_scripted_random_cycles() {
        let mut rng = ScriptedRandom::new(vec![0.1, 0.9]).unwrap();

        assert_eq!(rng.next_unit(), 0.1);
        assert_eq!(rng.next_unit(), 0.9);
        assert_eq!(rng.next_unit(), 0.1);
        assert_eq!(rng.draws(), 3);
    }

    #[test]
    fn test_scripted_random_rejects_bad_values() {
        assert!(matches!(ScriptedRandom::new(vec![]), Err(EnvError::EmptyScript)));
        assert!(matches!(
            ScriptedRandom::new(vec![0.5, 1.0]),
            Err(EnvError::DrawOutOfRange(v)) if v == 1.0
        ));
        assert!(ScriptedRandom::new(vec![-0.1]).is_err());
    }

    #[test]
    fn test_constant_clamps_below_one() {
        let mut rng = ScriptedRandom::constant(1.5);
        assert!(rng.next_unit() < 1.0);
    }

    #[test]
    fn test_rand_generators_are_sources() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let x = a.next_unit();
            assert!((0.0..1.0).contains(&x));
            assert_eq!(x, b.next_unit());
        }
    }
}
