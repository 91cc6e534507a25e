//! VO2max estimation from session summaries.
//!
//! Each session is offered to an ordered list of estimation methods. The
//! first method that applies and whose candidate passes the plausibility
//! gate wins; methods are never combined for one session. Accepted values
//! are blended with the two previous ones, and the finished sequence is
//! passed through a centered rolling median.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::calculator::SessionSummary;
use crate::metrics::smoothing::rolling_median;
use crate::metrics::zones::{IntensityBucket, ZoneBucket, ZoneTable};

/// Minimum estimates before the rolling median pass runs.
pub const MIN_ESTIMATES_FOR_SMOOTHING: usize = 5;

/// Rolling median window (estimates).
pub const MEDIAN_WINDOW: usize = 5;

/// Accepted previous values blended with a new estimate.
const BLEND_HISTORY: usize = 2;

/// Accepted previous values the jump check averages over.
const TOLERANCE_HISTORY: usize = 3;

/// Tuned constants of the estimation methods and the validation gate.
///
/// The multipliers and the drift are empirical calibration values, not
/// derived physiology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vo2maxCalibration {
    /// High-intensity multiplier
    pub high_intensity_factor: f64,
    /// Peak-power multiplier (ml/min per watt)
    pub peak_power_factor: f64,
    /// Decay drift per elapsed day (absolute units)
    pub decay_drift_per_day: f64,
    /// Largest allowed jump from recent accepted values (absolute units)
    pub jump_tolerance: f64,
    /// Lowest plausible relative VO2max (ml/kg/min)
    pub min_relative: f64,
    /// Highest plausible relative VO2max (ml/kg/min)
    pub max_relative: f64,
    /// Heart-rate floor for any estimate (bpm)
    pub min_heart_rate: f64,
    /// Highest plausible power to heart-rate ratio
    pub max_power_hr_ratio: f64,
    /// High-intensity: minimum intensity factor
    pub high_intensity_min_if: f64,
    /// High-intensity: minimum duration (seconds)
    pub high_intensity_min_secs: u32,
    /// High-intensity: maximum duration (seconds)
    pub high_intensity_max_secs: u32,
    /// High-intensity: minimum fraction of max heart rate
    pub high_intensity_hr_fraction: f64,
    /// Decay: minimum intensity factor
    pub decay_min_if: f64,
    /// Decay: minimum duration (seconds)
    pub decay_min_secs: u32,
    /// Decay: minimum fraction of max heart rate
    pub decay_hr_fraction: f64,
}

impl Default for Vo2maxCalibration {
    fn default() -> Self {
        Self {
            high_intensity_factor: 14.5,
            peak_power_factor: 14.2,
            decay_drift_per_day: -0.015,
            jump_tolerance: 600.0,
            min_relative: 45.0,
            max_relative: 80.0,
            min_heart_rate: 110.0,
            max_power_hr_ratio: 3.5,
            high_intensity_min_if: 0.8,
            high_intensity_min_secs: 4 * 60,
            high_intensity_max_secs: 25 * 60,
            high_intensity_hr_fraction: 0.78,
            decay_min_if: 0.65,
            decay_min_secs: 20 * 60,
            decay_hr_fraction: 0.70,
        }
    }
}

/// Fitness classification based on VO2max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessLevel {
    /// VO2max < 35: Untrained.
    Untrained,
    /// VO2max 35-45: Recreational.
    Recreational,
    /// VO2max 45-55: Trained.
    Trained,
    /// VO2max 55-65: Well-trained.
    WellTrained,
    /// VO2max 65-75: Elite.
    Elite,
    /// VO2max > 75: World-class.
    WorldClass,
}

impl FitnessLevel {
    /// Classify fitness level based on relative VO2max.
    pub fn from_vo2max(vo2max: f64) -> Self {
        if vo2max < 35.0 {
            FitnessLevel::Untrained
        } else if vo2max < 45.0 {
            FitnessLevel::Recreational
        } else if vo2max < 55.0 {
            FitnessLevel::Trained
        } else if vo2max < 65.0 {
            FitnessLevel::WellTrained
        } else if vo2max < 75.0 {
            FitnessLevel::Elite
        } else {
            FitnessLevel::WorldClass
        }
    }

    /// Get descriptive text for the fitness level.
    pub fn description(&self) -> &'static str {
        match self {
            FitnessLevel::Untrained => "Untrained - Consider starting with easy endurance rides",
            FitnessLevel::Recreational => "Recreational - Good base fitness for cycling",
            FitnessLevel::Trained => "Trained - Solid aerobic capacity",
            FitnessLevel::WellTrained => "Well-trained - Competitive amateur level",
            FitnessLevel::Elite => "Elite - Professional or high-level amateur",
            FitnessLevel::WorldClass => "World-class - Top-tier athletic capacity",
        }
    }
}

/// One VO2max estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vo2maxEstimate {
    /// Session the estimate came from
    pub session_id: Uuid,
    /// Session start
    pub timestamp: DateTime<Utc>,
    /// Relative VO2max (ml/kg/min)
    pub vo2max_ml_kg_min: f64,
    /// Absolute VO2max (ml/min)
    pub absolute_ml_min: f64,
    /// Method that produced the estimate
    pub method: Vo2maxMethod,
    /// Fitness classification of the relative value
    pub fitness_level: FitnessLevel,
}

/// Everything a method needs to judge one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext<'a> {
    pub session: &'a SessionSummary,
    pub weight_kg: f64,
    pub max_hr: f64,
    /// Most recent accepted estimate before this session
    pub previous: Option<&'a Vo2maxEstimate>,
    pub calibration: &'a Vo2maxCalibration,
}

impl SessionContext<'_> {
    fn hr_fraction(&self) -> Option<f64> {
        self.session.avg_hr.map(|hr| hr / self.max_hr)
    }

    fn peak_power(&self) -> Option<f64> {
        self.session
            .best_effort(300)
            .or_else(|| self.session.best_effort(600))
            .filter(|p| *p > 0.0)
    }
}

/// Estimation methods, tried in [`Vo2maxMethod::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vo2maxMethod {
    /// Short hard session with a high heart rate.
    HighIntensity,
    /// 5-minute (else 10-minute) peak power.
    PeakPower,
    /// Drift from the previous accepted estimate.
    DecayInterpolation,
}

impl Vo2maxMethod {
    /// Fixed priority order.
    pub const ORDER: [Vo2maxMethod; 3] = [
        Vo2maxMethod::HighIntensity,
        Vo2maxMethod::PeakPower,
        Vo2maxMethod::DecayInterpolation,
    ];

    /// Check whether the method can be used on a session.
    pub fn applies(self, ctx: &SessionContext<'_>) -> bool {
        let cal = ctx.calibration;
        let session = ctx.session;
        match self {
            Vo2maxMethod::HighIntensity => {
                session.normalized_power.is_some()
                    && session.intensity_factor.map_or(false, |f| f >= cal.high_intensity_min_if)
                    && (cal.high_intensity_min_secs..=cal.high_intensity_max_secs)
                        .contains(&session.duration_secs)
                    && ctx.hr_fraction().map_or(false, |f| f >= cal.high_intensity_hr_fraction)
            }
            Vo2maxMethod::PeakPower => ctx.peak_power().is_some(),
            Vo2maxMethod::DecayInterpolation => {
                ctx.previous.is_some()
                    && session.intensity_factor.map_or(false, |f| f >= cal.decay_min_if)
                    && session.duration_secs >= cal.decay_min_secs
                    && ctx.hr_fraction().map_or(false, |f| f >= cal.decay_hr_fraction)
            }
        }
    }

    /// Candidate absolute VO2max (ml/min).
    pub fn estimate(self, ctx: &SessionContext<'_>) -> Option<f64> {
        let cal = ctx.calibration;
        let session = ctx.session;
        let value = match self {
            Vo2maxMethod::HighIntensity => {
                let np = session.normalized_power?;
                let hr = session.avg_hr.filter(|hr| *hr > 0.0)?;
                let intensity = session.intensity_factor?;
                np / hr * intensity * ctx.weight_kg * cal.high_intensity_factor
            }
            Vo2maxMethod::PeakPower => cal.peak_power_factor * ctx.peak_power()?,
            Vo2maxMethod::DecayInterpolation => {
                let previous = ctx.previous?;
                let days = (session.start - previous.timestamp).num_seconds() as f64 / 86_400.0;
                previous.absolute_ml_min + cal.decay_drift_per_day * days
            }
        };
        value.is_finite().then_some(value)
    }
}

/// Reason a candidate failed the validation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    RelativeOutOfRange,
    HeartRateTooLow,
    PowerHeartRateRatio,
    JumpTooLarge,
}

/// Produces VO2max estimates for one athlete.
#[derive(Debug, Clone)]
pub struct Vo2maxEstimator {
    weight_kg: f64,
    max_hr: f64,
    calibration: Vo2maxCalibration,
}

impl Vo2maxEstimator {
    /// Create an estimator with default calibration.
    pub fn new(weight_kg: f64, max_hr: f64) -> Self {
        Self::with_calibration(weight_kg, max_hr, Vo2maxCalibration::default())
    }

    /// Create an estimator with custom calibration.
    pub fn with_calibration(weight_kg: f64, max_hr: f64, calibration: Vo2maxCalibration) -> Self {
        Self {
            weight_kg,
            max_hr,
            calibration,
        }
    }

    /// Estimate VO2max across sessions, in chronological order.
    ///
    /// Sessions lacking the channels a method needs simply do not apply.
    /// Returns an empty list for invalid athlete parameters.
    pub fn estimate(&self, sessions: &[SessionSummary]) -> Vec<Vo2maxEstimate> {
        if !(self.weight_kg > 0.0 && self.max_hr > 0.0) {
            tracing::debug!("VO2max skipped: invalid athlete parameters");
            return Vec::new();
        }

        let mut ordered: Vec<&SessionSummary> = sessions.iter().collect();
        ordered.sort_by_key(|s| s.start);

        let mut accepted: Vec<Vo2maxEstimate> = Vec::new();
        for session in ordered {
            let Some((method, candidate)) = self.first_accepted(session, &accepted) else {
                continue;
            };

            let recorded = blend(candidate, &accepted);
            let relative = recorded / self.weight_kg;
            accepted.push(Vo2maxEstimate {
                session_id: session.id,
                timestamp: session.start,
                vo2max_ml_kg_min: relative,
                absolute_ml_min: recorded,
                method,
                fitness_level: FitnessLevel::from_vo2max(relative),
            });
        }

        if accepted.len() >= MIN_ESTIMATES_FOR_SMOOTHING {
            smooth(&mut accepted);
        }

        tracing::debug!(
            "VO2max: {} estimates from {} sessions",
            accepted.len(),
            sessions.len()
        );

        accepted
    }

    fn first_accepted(&self, session: &SessionSummary, accepted: &[Vo2maxEstimate]) -> Option<(Vo2maxMethod, f64)> {
        let ctx = SessionContext {
            session,
            weight_kg: self.weight_kg,
            max_hr: self.max_hr,
            previous: accepted.last(),
            calibration: &self.calibration,
        };

        for method in Vo2maxMethod::ORDER {
            if !method.applies(&ctx) {
                continue;
            }
            let Some(candidate) = method.estimate(&ctx) else {
                continue;
            };
            match self.validate(candidate, session, accepted) {
                Ok(()) => return Some((method, candidate)),
                Err(reason) => {
                    tracing::debug!(
                        "VO2max {:?} candidate {:.0} for session {} rejected: {:?}",
                        method,
                        candidate,
                        session.id,
                        reason
                    );
                }
            }
        }
        None
    }

    /// Plausibility gate applied to every candidate.
    pub fn validate(
        &self,
        candidate: f64,
        session: &SessionSummary,
        accepted: &[Vo2maxEstimate],
    ) -> Result<(), GateRejection> {
        let cal = &self.calibration;

        let relative = candidate / self.weight_kg;
        if !(cal.min_relative..=cal.max_relative).contains(&relative) {
            return Err(GateRejection::RelativeOutOfRange);
        }

        let hr = match session.avg_hr {
            Some(hr) if hr >= cal.min_heart_rate => hr,
            _ => return Err(GateRejection::HeartRateTooLow),
        };

        if let Some(power) = session.avg_power.or(session.normalized_power) {
            if power / hr > cal.max_power_hr_ratio {
                return Err(GateRejection::PowerHeartRateRatio);
            }
        }

        let recent = &accepted[accepted.len().saturating_sub(TOLERANCE_HISTORY)..];
        if !recent.is_empty() {
            let mean = recent.iter().map(|e| e.absolute_ml_min).sum::<f64>() / recent.len() as f64;
            if (candidate - mean).abs() > cal.jump_tolerance {
                return Err(GateRejection::JumpTooLarge);
            }
        }

        Ok(())
    }
}

/// Average a candidate with the last accepted values.
fn blend(candidate: f64, accepted: &[Vo2maxEstimate]) -> f64 {
    let previous = &accepted[accepted.len().saturating_sub(BLEND_HISTORY)..];
    let sum = candidate + previous.iter().map(|e| e.absolute_ml_min).sum::<f64>();
    sum / (previous.len() + 1) as f64
}

fn smooth(estimates: &mut [Vo2maxEstimate]) {
    let relative: Vec<f64> = estimates.iter().map(|e| e.vo2max_ml_kg_min).collect();
    let absolute: Vec<f64> = estimates.iter().map(|e| e.absolute_ml_min).collect();
    let relative = rolling_median(&relative, MEDIAN_WINDOW);
    let absolute = rolling_median(&absolute, MEDIAN_WINDOW);

    for ((estimate, rel), abs) in estimates.iter_mut().zip(relative).zip(absolute) {
        estimate.vo2max_ml_kg_min = rel;
        estimate.absolute_ml_min = abs;
        estimate.fitness_level = FitnessLevel::from_vo2max(rel);
    }
}

/// Seconds per intensity class across a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityDistribution {
    pub recovery_secs: u64,
    pub aerobic_secs: u64,
    pub tempo_secs: u64,
    pub threshold_secs: u64,
    pub vo2_secs: u64,
}

impl IntensityDistribution {
    fn slot(&mut self, bucket: IntensityBucket) -> &mut u64 {
        match bucket {
            IntensityBucket::Recovery => &mut self.recovery_secs,
            IntensityBucket::Aerobic => &mut self.aerobic_secs,
            IntensityBucket::Tempo => &mut self.tempo_secs,
            IntensityBucket::Threshold => &mut self.threshold_secs,
            IntensityBucket::Vo2 => &mut self.vo2_secs,
        }
    }

    /// Add seconds to a class.
    pub fn add(&mut self, bucket: IntensityBucket, secs: u64) {
        *self.slot(bucket) += secs;
    }

    /// Seconds in a class.
    pub fn seconds(&self, bucket: IntensityBucket) -> u64 {
        match bucket {
            IntensityBucket::Recovery => self.recovery_secs,
            IntensityBucket::Aerobic => self.aerobic_secs,
            IntensityBucket::Tempo => self.tempo_secs,
            IntensityBucket::Threshold => self.threshold_secs,
            IntensityBucket::Vo2 => self.vo2_secs,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        IntensityBucket::ALL.iter().map(|b| self.seconds(*b)).sum()
    }

    /// Minutes spent at VO2max intensity.
    pub fn vo2_minutes(&self) -> f64 {
        self.vo2_secs as f64 / 60.0
    }

    /// Percent of total time in a class (0 when empty).
    pub fn percent(&self, bucket: IntensityBucket) -> f64 {
        let total = self.total_seconds();
        if total == 0 {
            return 0.0;
        }
        self.seconds(bucket) as f64 / total as f64 * 100.0
    }
}

/// Intensity class of a whole session from its intensity factor.
pub fn intensity_bucket_for_if(intensity_factor: f64) -> IntensityBucket {
    if intensity_factor < 0.55 {
        IntensityBucket::Recovery
    } else if intensity_factor < 0.75 {
        IntensityBucket::Aerobic
    } else if intensity_factor < 0.90 {
        IntensityBucket::Tempo
    } else if intensity_factor < 1.05 {
        IntensityBucket::Threshold
    } else {
        IntensityBucket::Vo2
    }
}

/// Bucket session time into intensity classes.
///
/// Each session contributes through its power-zone buckets when it has any
/// time in them, else its heart-rate-zone buckets, else its whole duration
/// in the class of its intensity factor.
pub fn intensity_distribution(
    sessions: &[SessionSummary],
    power_table: &ZoneTable,
    hr_table: &ZoneTable,
) -> IntensityDistribution {
    let mut distribution = IntensityDistribution::default();

    for session in sessions {
        if add_zone_time(&mut distribution, &session.power_zones, power_table) {
            continue;
        }
        if add_zone_time(&mut distribution, &session.hr_zones, hr_table) {
            continue;
        }
        if let Some(intensity) = session.intensity_factor.filter(|f| f.is_finite()) {
            distribution.add(intensity_bucket_for_if(intensity), u64::from(session.duration_secs));
        }
    }

    distribution
}

fn add_zone_time(distribution: &mut IntensityDistribution, buckets: &[ZoneBucket], table: &ZoneTable) -> bool {
    let total: u64 = buckets.iter().map(|b| u64::from(b.seconds_in_zone)).sum();
    if total == 0 {
        return false;
    }
    for bucket in buckets {
        if let Some(band) = table.band(&bucket.zone_label) {
            distribution.add(band.intensity, u64::from(bucket.seconds_in_zone));
        }
    }
    true
}
