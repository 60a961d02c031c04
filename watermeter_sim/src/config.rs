//! Configuration file with hot-reload.
//!
//! The file is a list of `key = value` lines (TOML). It is loaded once at
//! startup and re-read whenever its modification time advances. Each load
//! produces an immutable [`ConfigSnapshot`]; readers always get a complete
//! snapshot, never a half-updated one.

use crate::error::ConfigError;
use arc_swap::ArcSwap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;
use tracing::info;
use watermeter_core::{MeterError, OutageParams, TickParams};

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "resources/config.txt";

/// How often the file's modification time is checked.
pub const CONFIG_CHECK_PERIOD: Duration = Duration::from_secs(5);

/// Configuration keys.
pub mod keys {
    pub const BORE_MM: &str = "bitola_mm";
    pub const MAX_VOLUME_M3: &str = "max_volume_m3";
    pub const STEP_MS: &str = "delta_t_simulacao_ms";
    pub const DISPLAY_INTERVAL_MS: &str = "intervalo_update_display_ms";
    pub const AIR_FACTOR: &str = "fator_ar";
    pub const OUTAGE_PROBABILITY: &str = "chance_falta_agua";
    pub const TOTAL_OUTAGE_MS: &str = "duracao_falta_total_ms";
    pub const AIR_RETURN_MS: &str = "duracao_passagem_ar_ms";
    pub const BASE_PRESSURE_BAR: &str = "pressao_base_bar";
    pub const OVERRUN_POLICY: &str = "politica_atraso";
}

/// What a periodic task does when a tick is late.
///
/// Ticks of one task never overlap; the policy only decides how missed
/// periods are made up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrunPolicy {
    /// Restart the period from the late tick
    #[default]
    Delay,
    /// Drop missed periods
    Skip,
    /// Run missed periods back to back
    Burst,
}

impl OverrunPolicy {
    pub fn missed_tick_behavior(self) -> MissedTickBehavior {
        match self {
            OverrunPolicy::Delay => MissedTickBehavior::Delay,
            OverrunPolicy::Skip => MissedTickBehavior::Skip,
            OverrunPolicy::Burst => MissedTickBehavior::Burst,
        }
    }
}

impl FromStr for OverrunPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delay" => Ok(OverrunPolicy::Delay),
            "skip" => Ok(OverrunPolicy::Skip),
            "burst" => Ok(OverrunPolicy::Burst),
            _ => Err(format!("unknown overrun policy '{}' (expected delay, skip or burst)", s)),
        }
    }
}

/// Validated, typed view of the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSettings {
    pub bore_mm: f64,
    pub max_volume_m3: f64,
    pub step_ms: u64,
    pub display_interval_ms: u64,
    pub air_factor: f64,
    pub outage_probability: f64,
    pub total_outage_ms: u64,
    pub air_return_ms: u64,
    pub base_pressure_bar: f64,
    pub overrun_policy: OverrunPolicy,
}

impl MeterSettings {
    /// Reads every required key and checks its range.
    pub fn from_table(table: &toml::Table) -> Result<Self, ConfigError> {
        let settings = Self {
            bore_mm: positive_f64(table, keys::BORE_MM)?,
            max_volume_m3: positive_f64(table, keys::MAX_VOLUME_M3)?,
            step_ms: positive_u64(table, keys::STEP_MS)?,
            display_interval_ms: positive_u64(table, keys::DISPLAY_INTERVAL_MS)?,
            air_factor: non_negative_f64(table, keys::AIR_FACTOR)?,
            outage_probability: probability(table, keys::OUTAGE_PROBABILITY)?,
            total_outage_ms: non_negative_u64(table, keys::TOTAL_OUTAGE_MS)?,
            air_return_ms: non_negative_u64(table, keys::AIR_RETURN_MS)?,
            base_pressure_bar: get_f64(table, keys::BASE_PRESSURE_BAR)?,
            overrun_policy: overrun_policy(table)?,
        };
        // Catches anything the engine itself would refuse at tick time
        settings.tick_params()?;
        Ok(settings)
    }

    pub fn outage_params(&self) -> OutageParams {
        OutageParams {
            probability: self.outage_probability,
            total_outage_ms: self.total_outage_ms,
            air_return_ms: self.air_return_ms,
            step_ms: self.step_ms,
            base_pressure_bar: self.base_pressure_bar,
        }
    }

    /// Inputs for one simulation tick.
    pub fn tick_params(&self) -> Result<TickParams, MeterError> {
        Ok(TickParams {
            outage: self.outage_params().plan()?,
            step_secs: self.step_ms as f64 / 1000.0,
            air_factor: self.air_factor,
        })
    }

    pub fn step_period(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn display_period(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }
}

/// An immutable, fully validated load of the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    values: toml::Table,
    settings: MeterSettings,
    modified: Option<SystemTime>,
}

impl ConfigSnapshot {
    /// Parses and validates configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let values: toml::Table = text.parse()?;
        let settings = MeterSettings::from_table(&values)?;
        Ok(Self {
            values,
            settings,
            modified: None,
        })
    }

    fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    /// Raw float lookup; integer values are widened.
    pub fn get_f64(&self, key: &'static str) -> Result<f64, ConfigError> {
        get_f64(&self.values, key)
    }

    /// Raw integer lookup.
    pub fn get_i64(&self, key: &'static str) -> Result<i64, ConfigError> {
        get_i64(&self.values, key)
    }

    pub fn settings(&self) -> &MeterSettings {
        &self.settings
    }

    /// Modification time of the file this snapshot was read from.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// The configuration collaborator used by the runtime.
pub trait ConfigProvider: Send + Sync {
    /// Latest published snapshot.
    fn current(&self) -> Arc<ConfigSnapshot>;

    /// Reloads if the backing store changed.
    ///
    /// Returns the new snapshot when one was published. On error the
    /// previous snapshot stays current.
    fn maybe_reload(&self) -> Result<Option<Arc<ConfigSnapshot>>, ConfigError>;
}

/// Configuration backed by a file on disk, reloaded on mtime change.
pub struct FileConfig {
    path: PathBuf,
    current: ArcSwap<ConfigSnapshot>,
}

impl FileConfig {
    /// Loads the file. Any failure here is fatal for the caller.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = Self::read(&path)?;
        info!(path = %path.display(), "Configuration loaded");

        Ok(Self {
            path,
            current: ArcSwap::from_pointee(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
        let modified = modified_time(path)?;
        let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Ok(ConfigSnapshot::parse(&text)?.with_modified(Some(modified)))
    }
}

impl ConfigProvider for FileConfig {
    fn current(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    fn maybe_reload(&self) -> Result<Option<Arc<ConfigSnapshot>>, ConfigError> {
        let modified = modified_time(&self.path)?;
        let changed = match self.current.load().modified() {
            Some(last) => modified > last,
            None => true,
        };
        if !changed {
            return Ok(None);
        }

        info!(path = %self.path.display(), "Configuration file changed, reloading");
        let snapshot = Arc::new(Self::read(&self.path)?);
        self.current.store(Arc::clone(&snapshot));
        Ok(Some(snapshot))
    }
}

fn modified_time(path: &Path) -> Result<SystemTime, ConfigError> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| ConfigError::io(path, e))
}

fn get_f64(table: &toml::Table, key: &'static str) -> Result<f64, ConfigError> {
    match table.get(key) {
        Some(toml::Value::Float(v)) => Ok(*v),
        Some(toml::Value::Integer(v)) => Ok(*v as f64),
        Some(_) => Err(ConfigError::WrongType { key, expected: "a number" }),
        None => Err(ConfigError::MissingKey(key)),
    }
}

fn get_i64(table: &toml::Table, key: &'static str) -> Result<i64, ConfigError> {
    match table.get(key) {
        Some(toml::Value::Integer(v)) => Ok(*v),
        Some(_) => Err(ConfigError::WrongType { key, expected: "an integer" }),
        None => Err(ConfigError::MissingKey(key)),
    }
}

fn positive_f64(table: &toml::Table, key: &'static str) -> Result<f64, ConfigError> {
    let v = get_f64(table, key)?;
    if !v.is_finite() || v <= 0.0 {
        return Err(ConfigError::out_of_range(key, format!("{} must be > 0", v)));
    }
    Ok(v)
}

fn non_negative_f64(table: &toml::Table, key: &'static str) -> Result<f64, ConfigError> {
    let v = get_f64(table, key)?;
    if !v.is_finite() || v < 0.0 {
        return Err(ConfigError::out_of_range(key, format!("{} must be >= 0", v)));
    }
    Ok(v)
}

fn probability(table: &toml::Table, key: &'static str) -> Result<f64, ConfigError> {
    let v = get_f64(table, key)?;
    if !(0.0..=1.0).contains(&v) {
        return Err(ConfigError::out_of_range(key, format!("{} is not in [0, 1]", v)));
    }
    Ok(v)
}

fn non_negative_u64(table: &toml::Table, key: &'static str) -> Result<u64, ConfigError> {
    let v = get_i64(table, key)?;
    u64::try_from(v).map_err(|_| ConfigError::out_of_range(key, format!("{} must be >= 0", v)))
}

fn positive_u64(table: &toml::Table, key: &'static str) -> Result<u64, ConfigError> {
    match non_negative_u64(table, key)? {
        0 => Err(ConfigError::out_of_range(key, "0 must be > 0")),
        v => Ok(v),
    }
}

fn overrun_policy(table: &toml::Table) -> Result<OverrunPolicy, ConfigError> {
    let key = keys::OVERRUN_POLICY;
    match table.get(key) {
        None => Ok(OverrunPolicy::default()),
        Some(toml::Value::String(s)) => s.parse().map_err(|e: String| ConfigError::out_of_range(key, e)),
        Some(_) => Err(ConfigError::WrongType { key, expected: "a string" }),
    }
}
