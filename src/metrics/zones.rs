//! Power and heart rate zone tables, distributions, and balance analysis.
//!
//! Zone tables are immutable data: an ordered list of named fractional
//! bands (fractions of FTP for power, of maximum heart rate for HR) passed
//! into every function that classifies time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::metrics::calculator::SessionSummary;

/// Points of deviation tolerated before a zone counts as out of balance.
pub const BALANCE_TOLERANCE_PCT: f64 = 5.0;

/// Coarse intensity classes every zone band maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityBucket {
    /// Active recovery
    Recovery,
    /// Aerobic endurance
    Aerobic,
    /// Tempo
    Tempo,
    /// Lactate threshold
    Threshold,
    /// VO2max and above
    Vo2,
}

impl IntensityBucket {
    /// All buckets, easiest first.
    pub const ALL: [IntensityBucket; 5] = [
        IntensityBucket::Recovery,
        IntensityBucket::Aerobic,
        IntensityBucket::Tempo,
        IntensityBucket::Threshold,
        IntensityBucket::Vo2,
    ];

    /// Position in [`IntensityBucket::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IntensityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntensityBucket::Recovery => write!(f, "Recovery"),
            IntensityBucket::Aerobic => write!(f, "Aerobic"),
            IntensityBucket::Tempo => write!(f, "Tempo"),
            IntensityBucket::Threshold => write!(f, "Threshold"),
            IntensityBucket::Vo2 => write!(f, "VO2"),
        }
    }
}

/// One named band of a zone table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBand {
    /// Short label, e.g. "Z4"
    pub label: String,
    /// Display name
    pub name: String,
    /// Inclusive lower bound as a fraction of the reference value
    pub lower: f64,
    /// Exclusive upper bound (`None` = open-ended)
    pub upper: Option<f64>,
    /// Intensity class of time spent in this band
    pub intensity: IntensityBucket,
}

impl ZoneBand {
    fn new(label: &str, name: &str, lower: f64, upper: Option<f64>, intensity: IntensityBucket) -> Self {
        Self {
            label: label.to_string(),
            name: name.to_string(),
            lower,
            upper,
            intensity,
        }
    }

    /// Check whether a fraction of the reference value falls in this band.
    pub fn contains(&self, fraction: f64) -> bool {
        fraction >= self.lower && self.upper.map_or(true, |upper| fraction < upper)
    }
}

/// An ordered set of zone bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneTable {
    bands: Vec<ZoneBand>,
}

impl ZoneTable {
    /// Create a table from bands, ordered by lower bound.
    pub fn new(mut bands: Vec<ZoneBand>) -> Self {
        bands.sort_by(|a, b| a.lower.total_cmp(&b.lower));
        Self { bands }
    }

    /// Coggan 7-zone power table (fractions of FTP).
    pub fn coggan_power() -> Self {
        use IntensityBucket::*;
        Self::new(vec![
            ZoneBand::new("Z1", "Active Recovery", 0.0, Some(0.55), Recovery),
            ZoneBand::new("Z2", "Endurance", 0.55, Some(0.75), Aerobic),
            ZoneBand::new("Z3", "Tempo", 0.75, Some(0.90), Tempo),
            ZoneBand::new("Z4", "Threshold", 0.90, Some(1.05), Threshold),
            ZoneBand::new("Z5", "VO2max", 1.05, Some(1.20), Vo2),
            ZoneBand::new("Z6", "Anaerobic", 1.20, Some(1.50), Vo2),
            ZoneBand::new("Z7", "Neuromuscular", 1.50, None, Vo2),
        ])
    }

    /// 5-zone heart rate table (fractions of maximum heart rate).
    pub fn max_hr() -> Self {
        use IntensityBucket::*;
        Self::new(vec![
            ZoneBand::new("Z1", "Recovery", 0.0, Some(0.60), Recovery),
            ZoneBand::new("Z2", "Aerobic", 0.60, Some(0.70), Aerobic),
            ZoneBand::new("Z3", "Tempo", 0.70, Some(0.80), Tempo),
            ZoneBand::new("Z4", "Threshold", 0.80, Some(0.90), Threshold),
            ZoneBand::new("Z5", "Maximum", 0.90, None, Vo2),
        ])
    }

    /// All bands, lowest first.
    pub fn bands(&self) -> &[ZoneBand] {
        &self.bands
    }

    /// Find a band by label.
    pub fn band(&self, label: &str) -> Option<&ZoneBand> {
        self.bands.iter().find(|b| b.label == label)
    }

    /// Classify a fraction of the reference value.
    pub fn classify(&self, fraction: f64) -> Option<&ZoneBand> {
        if !fraction.is_finite() {
            return None;
        }
        self.bands.iter().find(|b| b.contains(fraction))
    }

    /// Classify an absolute value against a reference (FTP or max HR).
    pub fn zone_for(&self, value: f64, reference: f64) -> Option<&ZoneBand> {
        if reference <= 0.0 {
            return None;
        }
        self.classify(value / reference)
    }

    /// Absolute range of a band for a reference value.
    pub fn absolute_range(&self, label: &str, reference: f64) -> Option<(f64, Option<f64>)> {
        self.band(label)
            .map(|b| (b.lower * reference, b.upper.map(|u| u * reference)))
    }
}

/// Which zone scheme a bucket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneScheme {
    /// Power zones (fractions of FTP)
    Power,
    /// Heart-rate zones (fractions of max HR)
    HeartRate,
}

/// Seconds spent in one zone during one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneBucket {
    /// Zone label from the table that produced it
    pub zone_label: String,
    /// Seconds in the zone
    pub seconds_in_zone: u32,
}

/// Bucket a 1 Hz series into zones of a table.
///
/// Returns one bucket per band (zeros included). Missing samples are not
/// counted anywhere; an invalid reference yields no buckets.
pub fn zone_seconds(series: &[Option<f64>], table: &ZoneTable, reference: f64) -> Vec<ZoneBucket> {
    if !(reference.is_finite() && reference > 0.0) {
        return Vec::new();
    }

    let mut seconds = vec![0u32; table.bands().len()];
    for value in series.iter().flatten() {
        let fraction = value / reference;
        if let Some(idx) = table.bands().iter().position(|b| b.contains(fraction)) {
            seconds[idx] += 1;
        }
    }

    table
        .bands()
        .iter()
        .zip(seconds)
        .map(|(band, secs)| ZoneBucket {
            zone_label: band.label.clone(),
            seconds_in_zone: secs,
        })
        .collect()
}

/// Share of total time for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneShare {
    /// Zone label
    pub zone_label: String,
    /// Seconds across all selected sessions
    pub seconds: u64,
    /// Percent of total time (0-100)
    pub percent: f64,
}

/// Time-in-zone distribution across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDistribution {
    /// Scheme the buckets came from
    pub scheme: ZoneScheme,
    /// Total seconds across all zones
    pub total_seconds: u64,
    /// One entry per table band, in table order
    pub zones: Vec<ZoneShare>,
}

impl ZoneDistribution {
    /// Percent of time in a zone label.
    pub fn percent(&self, label: &str) -> f64 {
        self.zones
            .iter()
            .find(|z| z.zone_label == label)
            .map_or(0.0, |z| z.percent)
    }

    /// Percent of time per intensity bucket, using the table's band mapping.
    pub fn bucket_percents(&self, table: &ZoneTable) -> [f64; 5] {
        let mut percents = [0.0; 5];
        for share in &self.zones {
            if let Some(band) = table.band(&share.zone_label) {
                percents[band.intensity.index()] += share.percent;
            }
        }
        percents
    }
}

/// Aggregate per-session zone buckets into a distribution.
///
/// Returns `None` when the selected sessions logged no time in the scheme.
pub fn zone_distribution(
    sessions: &[SessionSummary],
    scheme: ZoneScheme,
    table: &ZoneTable,
) -> Option<ZoneDistribution> {
    let mut seconds = vec![0u64; table.bands().len()];

    for session in sessions {
        for bucket in session.zone_buckets(scheme) {
            if let Some(idx) = table.bands().iter().position(|b| b.label == bucket.zone_label) {
                seconds[idx] += u64::from(bucket.seconds_in_zone);
            }
        }
    }

    let total_seconds: u64 = seconds.iter().sum();
    if total_seconds == 0 {
        return None;
    }

    let zones = table
        .bands()
        .iter()
        .zip(seconds)
        .map(|(band, secs)| ZoneShare {
            zone_label: band.label.clone(),
            seconds: secs,
            percent: secs as f64 / total_seconds as f64 * 100.0,
        })
        .collect();

    Some(ZoneDistribution {
        scheme,
        total_seconds,
        zones,
    })
}

/// Named target intensity distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetModel {
    /// Mostly easy, some very hard, little in between
    Polarized,
    /// Volume decreasing steadily with intensity
    Pyramidal,
    /// Emphasis on upper tempo and sub-threshold work
    SweetSpot,
    /// Short, hard sessions
    HighIntensity,
}

impl TargetModel {
    /// Target percent of time per intensity bucket (sums to 100).
    pub fn targets(self) -> [f64; 5] {
        match self {
            TargetModel::Polarized => [10.0, 70.0, 5.0, 5.0, 10.0],
            TargetModel::Pyramidal => [10.0, 65.0, 15.0, 7.0, 3.0],
            TargetModel::SweetSpot => [10.0, 45.0, 25.0, 15.0, 5.0],
            TargetModel::HighIntensity => [10.0, 40.0, 15.0, 15.0, 20.0],
        }
    }
}

impl FromStr for TargetModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "polarized" => Ok(TargetModel::Polarized),
            "pyramidal" => Ok(TargetModel::Pyramidal),
            "sweet_spot" | "sweetspot" => Ok(TargetModel::SweetSpot),
            "high_intensity" | "hiit" => Ok(TargetModel::HighIntensity),
            other => Err(format!("Unknown target model: {other}")),
        }
    }
}

/// Classification of one bucket's deviation from target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    /// Within tolerance
    Balanced,
    /// Too much time
    Excess,
    /// Too little time
    Deficit,
}

/// Actual vs. target share for one intensity bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDeviation {
    /// Intensity bucket
    pub bucket: IntensityBucket,
    /// Actual percent of time
    pub actual_percent: f64,
    /// Target percent of time
    pub target_percent: f64,
    /// actual - target, in percentage points
    pub deviation: f64,
    /// Classification
    pub status: BalanceStatus,
    /// Recommendation text
    pub recommendation: String,
}

/// Balance analysis of a distribution against a target model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBalance {
    /// Target model compared against
    pub model: TargetModel,
    /// One entry per intensity bucket
    pub deviations: Vec<ZoneDeviation>,
}

impl ZoneBalance {
    /// True when every bucket is within tolerance.
    pub fn is_balanced(&self) -> bool {
        self.deviations
            .iter()
            .all(|d| d.status == BalanceStatus::Balanced)
    }
}

/// Compare a distribution against a target model.
pub fn zone_balance(distribution: &ZoneDistribution, table: &ZoneTable, model: TargetModel) -> ZoneBalance {
    let actual = distribution.bucket_percents(table);
    let targets = model.targets();

    let deviations = IntensityBucket::ALL
        .iter()
        .map(|&bucket| {
            let actual_percent = actual[bucket.index()];
            let target_percent = targets[bucket.index()];
            let deviation = actual_percent - target_percent;
            let status = if deviation.abs() <= BALANCE_TOLERANCE_PCT {
                BalanceStatus::Balanced
            } else if deviation > 0.0 {
                BalanceStatus::Excess
            } else {
                BalanceStatus::Deficit
            };

            ZoneDeviation {
                bucket,
                actual_percent,
                target_percent,
                deviation,
                status,
                recommendation: recommendation(bucket, status).to_string(),
            }
        })
        .collect();

    ZoneBalance { model, deviations }
}

fn recommendation(bucket: IntensityBucket, status: BalanceStatus) -> &'static str {
    use BalanceStatus::*;
    use IntensityBucket::*;
    match (bucket, status) {
        (_, Balanced) => "On target. Keep the current mix.",
        (Recovery, Excess) => "Lots of very easy riding. Turn some of it into steady endurance work.",
        (Recovery, Deficit) => "Add short easy spins between hard days to absorb training.",
        (Aerobic, Excess) => "Aerobic volume is high. Add structured intensity to keep progressing.",
        (Aerobic, Deficit) => "Build more long steady endurance rides for your aerobic base.",
        (Tempo, Excess) => "Too much moderate riding. Go easier on easy days and harder on hard days.",
        (Tempo, Deficit) => "Include some sustained tempo efforts for muscular endurance.",
        (Threshold, Excess) => "Threshold load is high. Watch fatigue and schedule recovery.",
        (Threshold, Deficit) => "Add threshold intervals, e.g. 2x20 min near FTP.",
        (Vo2, Excess) => "High-intensity volume is high. Limit to two hard sessions per week.",
        (Vo2, Deficit) => "Add VO2max intervals, e.g. 5x4 min at 110-120% FTP.",
    }
}
