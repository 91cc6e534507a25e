//! Per-session summary metrics.
//!
//! Summaries are computed once when a session is ingested: average and
//! Normalized Power, Intensity Factor, TSS, heart-rate statistics, best
//! efforts at canonical durations, and time in zones. Every model that only
//! needs scalars reads these instead of the raw series.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::analytics::pdc::{compute_session_curve, CANONICAL_DURATIONS};
use crate::metrics::smoothing::normalized_power;
use crate::metrics::zones::{zone_seconds, ZoneBucket, ZoneScheme, ZoneTable};
use crate::recording::NormalizedSession;

/// Scalar summary of one completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier
    pub id: Uuid,
    /// Session start
    pub start: DateTime<Utc>,
    /// Elapsed duration in seconds
    pub duration_secs: u32,
    /// Average power in watts
    pub avg_power: Option<f64>,
    /// Normalized Power in watts
    pub normalized_power: Option<f64>,
    /// Intensity Factor (NP / FTP)
    pub intensity_factor: Option<f64>,
    /// Training Stress Score
    pub tss: Option<f64>,
    /// Average heart rate
    pub avg_hr: Option<f64>,
    /// Maximum heart rate
    pub max_hr: Option<f64>,
    /// Best mean power per canonical duration (seconds -> watts)
    #[serde(default)]
    pub best_efforts: BTreeMap<u32, f64>,
    /// Seconds in power zones
    #[serde(default)]
    pub power_zones: Vec<ZoneBucket>,
    /// Seconds in heart-rate zones
    #[serde(default)]
    pub hr_zones: Vec<ZoneBucket>,
}

impl SessionSummary {
    /// Create a bare summary with no channel data.
    pub fn new(id: Uuid, start: DateTime<Utc>, duration_secs: u32) -> Self {
        Self {
            id,
            start,
            duration_secs,
            avg_power: None,
            normalized_power: None,
            intensity_factor: None,
            tss: None,
            avg_hr: None,
            max_hr: None,
            best_efforts: BTreeMap::new(),
            power_zones: Vec::new(),
            hr_zones: Vec::new(),
        }
    }

    /// Calendar day the session started on.
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Best effort at a duration, if captured.
    pub fn best_effort(&self, duration_secs: u32) -> Option<f64> {
        self.best_efforts.get(&duration_secs).copied()
    }

    /// Zone buckets of a scheme.
    pub fn zone_buckets(&self, scheme: ZoneScheme) -> &[ZoneBucket] {
        match scheme {
            ZoneScheme::Power => &self.power_zones,
            ZoneScheme::HeartRate => &self.hr_zones,
        }
    }

    /// TSS as recorded, else derived from Normalized Power and FTP.
    pub fn tss_for(&self, ftp: f64) -> Option<f64> {
        self.tss
            .filter(|t| t.is_finite() && *t >= 0.0)
            .or_else(|| {
                self.normalized_power
                    .and_then(|np| training_stress_score(self.duration_secs, np, ftp))
            })
    }
}

/// Training Stress Score: `secs * NP * IF / (FTP * 3600) * 100`.
pub fn training_stress_score(duration_secs: u32, normalized_power: f64, ftp: f64) -> Option<f64> {
    if !(ftp.is_finite() && ftp > 0.0) || !normalized_power.is_finite() {
        return None;
    }
    let intensity = normalized_power / ftp;
    Some(duration_secs as f64 * normalized_power * intensity / (ftp * 3600.0) * 100.0)
}

/// Builds session summaries for one athlete.
pub struct SessionCalculator {
    /// Athlete FTP in watts
    ftp: f64,
    /// Athlete maximum heart rate
    max_hr: f64,
    /// Power zone table
    power_table: ZoneTable,
    /// Heart-rate zone table
    hr_table: ZoneTable,
}

impl SessionCalculator {
    /// Create a calculator with the canonical zone tables.
    pub fn new(ftp: f64, max_hr: f64) -> Self {
        Self::with_tables(ftp, max_hr, ZoneTable::coggan_power(), ZoneTable::max_hr())
    }

    /// Create a calculator with custom zone tables.
    pub fn with_tables(ftp: f64, max_hr: f64, power_table: ZoneTable, hr_table: ZoneTable) -> Self {
        Self {
            ftp,
            max_hr,
            power_table,
            hr_table,
        }
    }

    /// Summarize a normalized session.
    pub fn summarize(&self, id: Uuid, start: DateTime<Utc>, session: &NormalizedSession) -> SessionSummary {
        let mut summary = SessionSummary::new(id, start, session.len() as u32);

        summary.avg_power = session.average_power();
        if session.valid_power_samples() > 0 {
            summary.normalized_power = normalized_power(&session.power);
        }
        if self.ftp > 0.0 {
            summary.intensity_factor = summary.normalized_power.map(|np| np / self.ftp);
            summary.tss = summary
                .normalized_power
                .and_then(|np| training_stress_score(summary.duration_secs, np, self.ftp));
            summary.power_zones = zone_seconds(&session.power, &self.power_table, self.ftp);
        }

        summary.avg_hr = session.average_heart_rate();
        summary.max_hr = session.max_heart_rate();
        if self.max_hr > 0.0 {
            summary.hr_zones = zone_seconds(&session.heart_rate, &self.hr_table, self.max_hr);
        }

        if session.has_power_curve_data() {
            if let Some(curve) = compute_session_curve(&session.power) {
                summary.best_efforts = curve
                    .best_efforts(CANONICAL_DURATIONS)
                    .into_iter()
                    .map(|e| (e.duration_secs, e.power_watts))
                    .collect();
            }
        }

        tracing::debug!(
            "Summarized session {}: {}s, NP {:?}, TSS {:?}",
            id,
            summary.duration_secs,
            summary.normalized_power,
            summary.tss
        );

        summary
    }
}
