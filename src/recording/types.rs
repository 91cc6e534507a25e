//! Recording types for decoded session streams.
//!
//! Device-file decoding happens upstream; these types describe what arrives
//! once power and heart-rate values are available, and the aligned 1 Hz
//! session the normalizer produces from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of valid power samples for power-curve derivation.
pub const MIN_POWER_SAMPLES: usize = 30;

/// A single decoded record from a device file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Absolute timestamp, when the device recorded one
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Seconds since session start, when no timestamp is available
    #[serde(default)]
    pub elapsed: Option<f64>,
    /// Instantaneous power in watts
    #[serde(default)]
    pub power: Option<f64>,
    /// Heart rate in BPM
    #[serde(default)]
    pub heart_rate: Option<f64>,
}

impl RawRecord {
    /// Create a record at the given elapsed offset.
    pub fn at(elapsed: f64) -> Self {
        Self {
            elapsed: Some(elapsed),
            ..Default::default()
        }
    }

    /// Set the power channel.
    pub fn with_power(mut self, watts: f64) -> Self {
        self.power = Some(watts);
        self
    }

    /// Set the heart-rate channel.
    pub fn with_heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate = Some(bpm);
        self
    }
}

/// A pre-aligned stream payload as delivered by a provider API.
///
/// Channels are parallel arrays keyed by `time`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamPayload {
    /// Seconds since session start for each index
    pub time: Vec<f64>,
    /// Power channel
    #[serde(default, alias = "power")]
    pub watts: Option<Vec<Option<f64>>>,
    /// Heart-rate channel
    #[serde(default)]
    pub heartrate: Option<Vec<Option<f64>>>,
}

/// Any session input the normalizer accepts from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionInput {
    /// Provider stream keyed by channel
    Stream(StreamPayload),
    /// Per-record sequence
    Records(Vec<RawRecord>),
}

/// A session aligned onto a 1 Hz grid.
///
/// Index `i` holds the values at `i` seconds after session start. `None`
/// means the channel was not recorded, `Some(0.0)` means a recorded zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSession {
    /// Power in watts per second
    pub power: Vec<Option<f64>>,
    /// Heart rate in BPM per second
    pub heart_rate: Vec<Option<f64>>,
    /// Power readings present in the source, before gaps were filled
    #[serde(default)]
    pub recorded_power_samples: usize,
}

impl NormalizedSession {
    /// An empty session ("no data available").
    pub fn empty() -> Self {
        Self::default()
    }

    /// A session from channels that are already on a 1 Hz grid.
    pub fn from_channels(power: Vec<Option<f64>>, heart_rate: Vec<Option<f64>>) -> Self {
        let recorded_power_samples = power.iter().filter(|p| p.is_some()).count();
        Self {
            power,
            heart_rate,
            recorded_power_samples,
        }
    }

    /// Session length in seconds.
    pub fn len(&self) -> usize {
        self.power.len()
    }

    /// Check if the session holds no samples.
    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Number of seconds with a recorded power value.
    pub fn valid_power_samples(&self) -> usize {
        self.power.iter().filter(|p| p.is_some()).count()
    }

    /// Number of seconds with a recorded heart-rate value.
    pub fn valid_heart_rate_samples(&self) -> usize {
        self.heart_rate.iter().filter(|h| h.is_some()).count()
    }

    /// Whether enough power was recorded to derive a power curve.
    ///
    /// Counts source readings, so seconds filled in by interpolation do not
    /// make a sparse recording eligible.
    pub fn has_power_curve_data(&self) -> bool {
        self.recorded_power_samples >= MIN_POWER_SAMPLES
    }

    /// Mean of the recorded power values.
    pub fn average_power(&self) -> Option<f64> {
        mean_of(&self.power)
    }

    /// Mean of the recorded heart-rate values.
    pub fn average_heart_rate(&self) -> Option<f64> {
        mean_of(&self.heart_rate)
    }

    /// Highest recorded heart rate.
    pub fn max_heart_rate(&self) -> Option<f64> {
        self.heart_rate.iter().flatten().copied().reduce(f64::max)
    }
}

fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
