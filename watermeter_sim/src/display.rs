//! Reading presentation: dial face and reading sinks.

use crate::error::SimError;
use std::fmt;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use watermeter_core::{OutageState, Reading};

/// Context published alongside a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingStamp {
    /// Time since the run started
    pub elapsed: Duration,

    /// Wall-clock (or virtual wall-clock) time of the reading
    pub taken_at: SystemTime,

    /// Outage stage at the time of the reading
    pub state: OutageState,
}

/// Destination for published readings.
pub trait ReadingSink: Send {
    fn publish(&mut self, reading: &Reading, stamp: &ReadingStamp) -> Result<(), SimError>;
}

/// The odometer face of the meter.
///
/// Four black drums for whole cubic metres, then two red drums for
/// hundreds and tens of litres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialFace {
    pub whole_m3: u32,
    pub hundreds_litres: u8,
    pub tens_litres: u8,
}

impl DialFace {
    pub fn from_volume(volume_m3: f64) -> Self {
        let v = if volume_m3.is_finite() { volume_m3.max(0.0) } else { 0.0 };
        // All drums read from one count; the nudge keeps 2.05 from landing on 204.999...
        let tens = (v * 100.0 + 1e-9).floor() as u64;
        Self {
            whole_m3: (tens / 100 % 10_000) as u32,
            hundreds_litres: (tens / 10 % 10) as u8,
            tens_litres: (tens % 10) as u8,
        }
    }
}

impl fmt::Display for DialFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}.{}{}", self.whole_m3, self.hundreds_litres, self.tens_litres)
    }
}

/// Logs each reading with its dial face.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl LogDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl ReadingSink for LogDisplay {
    fn publish(&mut self, reading: &Reading, stamp: &ReadingStamp) -> Result<(), SimError> {
        info!(
            dial = %DialFace::from_volume(reading.volume_m3),
            state = ?stamp.state,
            "Volume = {:.4} m³ | Pressure = {:.2} bar",
            reading.volume_m3,
            reading.pressure_bar
        );
        Ok(())
    }
}

/// Fans a reading out to several sinks.
///
/// A failing sink does not stop the others; the first error is returned.
#[derive(Default)]
pub struct SinkChain {
    sinks: Vec<Box<dyn ReadingSink>>,
}

impl SinkChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Box<dyn ReadingSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Box<dyn ReadingSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ReadingSink for SinkChain {
    fn publish(&mut self, reading: &Reading, stamp: &ReadingStamp) -> Result<(), SimError> {
        let mut first_error = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.publish(reading, stamp) {
                warn!(error = %e, "Reading sink failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl ReadingSink for Counting {
        fn publish(&mut self, _: &Reading, _: &ReadingStamp) -> Result<(), SimError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    impl ReadingSink for Failing {
        fn publish(&mut self, _: &Reading, _: &ReadingStamp) -> Result<(), SimError> {
            Err(SimError::Io(std::io::Error::other("disk full")))
        }
    }

    fn stamp() -> ReadingStamp {
        ReadingStamp {
            elapsed: Duration::ZERO,
            taken_at: SystemTime::UNIX_EPOCH,
            state: OutageState::Normal,
        }
    }

    #[test]
    fn test_dial_face_digits() {
        let face = DialFace::from_volume(12.345);
        assert_eq!(face.whole_m3, 12);
        assert_eq!(face.hundreds_litres, 3);
        assert_eq!(face.tens_litres, 4);
        assert_eq!(face.to_string(), "0012.34");
    }

    #[test]
    fn test_dial_face_just_below_digit_boundary() {
        // 2.05 * 100.0 == 204.99999999999997
        assert_eq!(DialFace::from_volume(2.05).to_string(), "0002.05");
        assert_eq!(DialFace::from_volume(0.29).to_string(), "0000.29");
        assert_eq!(DialFace::from_volume(9.99).to_string(), "0009.99");
        assert_eq!(DialFace::from_volume(2.049).to_string(), "0002.04");
    }

    #[test]
    fn test_dial_face_wraps_and_clamps() {
        assert_eq!(DialFace::from_volume(12345.678).to_string(), "2345.67");
        assert_eq!(DialFace::from_volume(-3.0).to_string(), "0000.00");
        assert_eq!(DialFace::from_volume(f64::NAN).to_string(), "0000.00");
    }

    #[test]
    fn test_chain_continues_past_failure() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut chain = SinkChain::new()
            .with(Box::new(Failing))
            .with(Box::new(Counting(Arc::clone(&count))));
        let reading = Reading { volume_m3: 1.0, pressure_bar: 2.0 };

        assert!(chain.publish(&reading, &stamp()).is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(chain.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_dial_face_digits_are_decimal(volume in 0.0f64..1e6) {
            let face = DialFace::from_volume(volume);
            prop_assert!(face.whole_m3 < 10_000);
            prop_assert!(face.hundreds_litres < 10);
            prop_assert!(face.tens_litres < 10);
            prop_assert_eq!(face.to_string().len(), 7);
        }
    }
}
