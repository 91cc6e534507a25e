//! Athlete profile and engine configuration.
//!
//! Configuration is stored as TOML in the platform data directory. Every
//! section has defaults, so a missing file or a partial file both load.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::metrics::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::metrics::analytics::pdc::MAX_CURVE_SECS;
use crate::metrics::analytics::vo2max::Vo2maxCalibration;
use crate::storage::cache::ModelKind;

/// Physiological parameters every model call takes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Functional Threshold Power in watts (50-600)
    pub ftp: f64,
    /// Weight in kilograms (30-200)
    pub weight_kg: f64,
    /// Maximum heart rate in bpm (100-230)
    pub max_hr: f64,
}

impl AthleteProfile {
    pub fn new(ftp: f64, weight_kg: f64, max_hr: f64) -> Self {
        Self {
            ftp,
            weight_kg,
            max_hr,
        }
    }

    /// Validate FTP value (50-600 watts).
    pub fn validate_ftp(ftp: f64) -> bool {
        (50.0..=600.0).contains(&ftp)
    }

    /// Validate weight value (30-200 kg).
    pub fn validate_weight(weight: f64) -> bool {
        (30.0..=200.0).contains(&weight)
    }

    /// Validate maximum heart rate (100-230 bpm).
    pub fn validate_max_hr(max_hr: f64) -> bool {
        (100.0..=230.0).contains(&max_hr)
    }

    /// Check all parameters.
    pub fn validate(&self) -> AnalyticsResult<()> {
        if !Self::validate_ftp(self.ftp) {
            return Err(AnalyticsError::InvalidInput(format!(
                "FTP must be between 50 and 600 watts, got {}",
                self.ftp
            )));
        }
        if !Self::validate_weight(self.weight_kg) {
            return Err(AnalyticsError::InvalidInput(format!(
                "Weight must be between 30 and 200 kg, got {}",
                self.weight_kg
            )));
        }
        if !Self::validate_max_hr(self.max_hr) {
            return Err(AnalyticsError::InvalidInput(format!(
                "Max HR must be between 100 and 230 bpm, got {}",
                self.max_hr
            )));
        }
        Ok(())
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Crate version that wrote the file
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// VO2max calibration constants
    pub vo2max: Vo2maxCalibration,
    /// Cache settings
    pub cache: CacheSettings,
    /// Power curve settings
    pub power_curve: PowerCurveSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            vo2max: Vo2maxCalibration::default(),
            cache: CacheSettings::default(),
            power_curve: PowerCurveSettings::default(),
        }
    }
}

/// Cache max-ages in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Use the cache at all
    pub enabled: bool,
    pub power_curve_minutes: u32,
    pub critical_power_minutes: u32,
    pub w_prime_balance_minutes: u32,
    pub training_load_minutes: u32,
    pub vo2max_minutes: u32,
    pub zones_minutes: u32,
    pub efficiency_minutes: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            power_curve_minutes: 24 * 60,
            critical_power_minutes: 24 * 60,
            w_prime_balance_minutes: 24 * 60,
            training_load_minutes: 60,
            vo2max_minutes: 6 * 60,
            zones_minutes: 6 * 60,
            efficiency_minutes: 6 * 60,
        }
    }
}

impl CacheSettings {
    /// Max-age of a model's cached result.
    pub fn max_age(&self, kind: ModelKind) -> Duration {
        let minutes = match kind {
            ModelKind::PowerCurve => self.power_curve_minutes,
            ModelKind::CriticalPower => self.critical_power_minutes,
            ModelKind::WPrimeBalance => self.w_prime_balance_minutes,
            ModelKind::TrainingLoad => self.training_load_minutes,
            ModelKind::Vo2max => self.vo2max_minutes,
            ModelKind::IntensityDistribution | ModelKind::ZoneDistribution | ModelKind::ZoneBalance => {
                self.zones_minutes
            }
            ModelKind::EfficiencyTrend => self.efficiency_minutes,
        };
        Duration::minutes(i64::from(minutes))
    }
}

/// Power curve settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerCurveSettings {
    /// Longest duration kept in merged curves (seconds)
    pub cap_secs: u32,
    /// Compute per-session curves in parallel
    pub parallel: bool,
}

impl Default for PowerCurveSettings {
    fn default() -> Self {
        Self {
            cap_secs: MAX_CURVE_SECS as u32,
            parallel: true,
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "powerlab", "PowerLab")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load engine configuration from the default location.
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load engine configuration from a file, using defaults when it is missing.
pub fn load_config_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        let config = EngineConfig {
            data_dir: get_data_dir(),
            ..Default::default()
        };
        return Ok(config);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: EngineConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = get_data_dir();

    Ok(config)
}

/// Save engine configuration to the default location.
pub fn save_config(config: &EngineConfig) -> Result<(), ConfigError> {
    save_config_to(&get_config_path(), config)
}

/// Save engine configuration to a file.
pub fn save_config_to(path: &Path, config: &EngineConfig) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    tracing::info!("Saved engine config to {}", path.display());

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
