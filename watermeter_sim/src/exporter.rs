//! JSON export of a virtual-time run.

use crate::display::{ReadingSink, ReadingStamp};
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use watermeter_core::{OutageState, Reading};

/// A single published reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingFrame {
    /// Simulation time in seconds
    pub time_sec: f64,
    pub volume_m3: f64,
    pub pressure_bar: f64,
    pub state: OutageState,
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Outage episodes started during the run
    pub outage_episodes: u64,

    /// All frames
    pub frames: Vec<ReadingFrame>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            duration_sec: 0.0,
            outage_episodes: 0,
            frames: Vec::new(),
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: ReadingFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, duration_sec: f64, outage_episodes: u64) {
        self.duration_sec = duration_sec;
        self.outage_episodes = outage_episodes;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Shared view of the frames collected by a [`FrameRecorder`].
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    frames: Arc<Mutex<Vec<ReadingFrame>>>,
}

impl FrameLog {
    pub fn frames(&self) -> Vec<ReadingFrame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sink that records every published reading as a frame.
pub struct FrameRecorder {
    log: FrameLog,
}

impl FrameRecorder {
    /// Returns the recorder and a handle for reading its frames later.
    pub fn create() -> (Self, FrameLog) {
        let log = FrameLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl ReadingSink for FrameRecorder {
    fn publish(&mut self, reading: &Reading, stamp: &ReadingStamp) -> Result<(), SimError> {
        self.log
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ReadingFrame {
                time_sec: stamp.elapsed.as_secs_f64(),
                volume_m3: reading.volume_m3,
                pressure_bar: reading.pressure_bar,
                state: stamp.state,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_recorder_collects_frames() {
        let (mut recorder, log) = FrameRecorder::create();
        let stamp = ReadingStamp {
            elapsed: Duration::from_millis(1500),
            taken_at: SystemTime::UNIX_EPOCH,
            state: OutageState::OutageAirReturn,
        };

        recorder
            .publish(&Reading { volume_m3: 0.5, pressure_bar: 0.05 }, &stamp)
            .unwrap();

        let frames = log.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].time_sec, 1.5);
        assert_eq!(frames[0].state, OutageState::OutageAirReturn);
    }

    #[test]
    fn test_export_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut export = SimExport::new(42);
        export.add_frame(ReadingFrame {
            time_sec: 1.0,
            volume_m3: 0.03,
            pressure_bar: 2.0,
            state: OutageState::Normal,
        });
        export.finalize(2.0, 1);
        export.write_to_file(&path).unwrap();

        let loaded: SimExport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.seed, 42);
        assert_eq!(loaded.duration_sec, 2.0);
        assert_eq!(loaded.outage_episodes, 1);
        assert_eq!(loaded.frames.len(), 1);
    }
}
