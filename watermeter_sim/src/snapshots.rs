//! Periodic snapshots of the meter face, one per completed cubic metre.

use crate::display::{DialFace, ReadingSink, ReadingStamp};
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::info;
use watermeter_core::{OutageState, Reading};

/// Number of snapshot slots before file names are reused.
pub const SNAPSHOT_SLOTS: u64 = 99;

/// A persisted meter reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterSnapshot {
    pub whole_m3: u64,
    pub volume_m3: f64,
    pub pressure_bar: f64,
    pub dial: String,
    pub state: OutageState,
    pub elapsed_secs: f64,
    pub taken_at_unix_ms: u64,
}

/// Writes `<dir>/NN.json` each time the whole-m3 part of the reading changes.
///
/// Slots cycle through `01..=99`, so the 100th cubic metre overwrites `01.json`.
pub struct SnapshotRecorder {
    dir: PathBuf,
    last_saved_m3: Option<u64>,
}

impl SnapshotRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_saved_m3: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that will hold the snapshot for `whole_m3` (which must be > 0).
    pub fn slot_path(&self, whole_m3: u64) -> PathBuf {
        let slot = (whole_m3.saturating_sub(1) % SNAPSHOT_SLOTS) + 1;
        self.dir.join(format!("{:02}.json", slot))
    }
}

impl ReadingSink for SnapshotRecorder {
    fn publish(&mut self, reading: &Reading, stamp: &ReadingStamp) -> Result<(), SimError> {
        let whole_m3 = reading.volume_m3.max(0.0).trunc() as u64;
        if whole_m3 == 0 || self.last_saved_m3 == Some(whole_m3) {
            return Ok(());
        }
        // Marked before writing: a failed write is not retried for the same m3
        self.last_saved_m3 = Some(whole_m3);

        fs::create_dir_all(&self.dir)?;

        let snapshot = MeterSnapshot {
            whole_m3,
            volume_m3: reading.volume_m3,
            pressure_bar: reading.pressure_bar,
            dial: DialFace::from_volume(reading.volume_m3).to_string(),
            state: stamp.state,
            elapsed_secs: stamp.elapsed.as_secs_f64(),
            taken_at_unix_ms: stamp
                .taken_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        };

        let path = self.slot_path(whole_m3);
        fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;
        info!(path = %path.display(), "Reading saved");
        Ok(())
    }
}
