//! Power Duration Curve (PDC) calculation and merging.
//!
//! The PDC represents the maximum average power a rider sustained for each
//! duration from 1 second up to one hour. This module provides:
//! - Per-session MMP (Mean Maximal Power) extraction
//! - Element-wise merging into all-time or period-scoped curves
//! - A lower-fidelity curve synthesized from captured best-effort scalars

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Longest window a curve covers, in seconds.
pub const MAX_CURVE_SECS: usize = 3600;

/// Canonical best-effort durations (seconds).
pub const CANONICAL_DURATIONS: &[u32] = &[5, 60, 180, 300, 600, 1200, 1800, 3600];

/// One best-effort row of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestEffort {
    /// Duration in seconds.
    pub duration_secs: u32,
    /// Best mean power at this duration (watts).
    pub power_watts: f64,
}

impl BestEffort {
    /// Create a best-effort point.
    pub fn new(duration_secs: u32, power_watts: f64) -> Self {
        Self {
            duration_secs,
            power_watts,
        }
    }
}

/// How a curve was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveFidelity {
    /// From per-second samples
    #[default]
    Measured,
    /// Interpolated from discrete best-effort scalars
    Synthetic,
}

/// Power Duration Curve indexed by duration.
///
/// `watts[i]` is the best mean power over `i + 1` seconds, `None` where no
/// session covered that duration. Values are not assumed non-increasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerCurve {
    /// Best mean power per duration, 1 s first.
    watts: Vec<Option<f64>>,
    /// Source fidelity.
    fidelity: CurveFidelity,
}

impl PowerCurve {
    /// Create a curve from per-duration values.
    pub fn from_values(watts: Vec<Option<f64>>, fidelity: CurveFidelity) -> Self {
        Self { watts, fidelity }
    }

    /// Best mean power at a duration, if known.
    pub fn power_at(&self, duration_secs: u32) -> Option<f64> {
        if duration_secs == 0 {
            return None;
        }
        self.watts.get(duration_secs as usize - 1).copied().flatten()
    }

    /// Per-duration values, 1 s first.
    pub fn values(&self) -> &[Option<f64>] {
        &self.watts
    }

    /// Source fidelity.
    pub fn fidelity(&self) -> CurveFidelity {
        self.fidelity
    }

    /// Check whether the curve was synthesized.
    pub fn is_synthetic(&self) -> bool {
        self.fidelity == CurveFidelity::Synthetic
    }

    /// Number of durations covered.
    pub fn len(&self) -> usize {
        self.watts.len()
    }

    /// Check if the curve is empty.
    pub fn is_empty(&self) -> bool {
        self.watts.is_empty()
    }

    /// Longest duration with a known value.
    pub fn max_duration(&self) -> Option<u32> {
        self.watts
            .iter()
            .rposition(|w| w.is_some())
            .map(|idx| idx as u32 + 1)
    }

    /// Best efforts at the given durations, skipping unknown ones.
    pub fn best_efforts(&self, durations: &[u32]) -> Vec<BestEffort> {
        durations
            .iter()
            .filter_map(|&d| self.power_at(d).map(|p| BestEffort::new(d, p)))
            .collect()
    }

    /// Durations where this curve beats `previous` (or `previous` is unknown).
    pub fn improvements_over(&self, previous: &PowerCurve) -> Vec<BestEffort> {
        self.watts
            .iter()
            .enumerate()
            .filter_map(|(idx, w)| {
                let power = (*w)?;
                let duration = idx as u32 + 1;
                match previous.power_at(duration) {
                    Some(old) if old >= power => None,
                    _ => Some(BestEffort::new(duration, power)),
                }
            })
            .collect()
    }

    /// Truncate to a period cap.
    pub fn capped(mut self, cap_secs: usize) -> Self {
        self.watts.truncate(cap_secs);
        self
    }
}

/// Compute a session's power curve from a 1 Hz series.
///
/// For every window length up to `min(len, 3600)` this takes the maximum
/// mean over all full windows, sliding a running sum per window length.
/// Missing samples count as zero output. Returns `None` when the series
/// holds no valid power sample.
pub fn compute_session_curve(power: &[Option<f64>]) -> Option<PowerCurve> {
    if !power.iter().any(|p| p.is_some()) {
        return None;
    }

    let samples: Vec<f64> = power.iter().map(|p| p.unwrap_or(0.0)).collect();
    let n = samples.len();
    let max_window = n.min(MAX_CURVE_SECS);
    let mut watts = Vec::with_capacity(max_window);

    for window in 1..=max_window {
        let mut sum: f64 = samples[..window].iter().sum();
        let mut best = sum;

        for end in window..n {
            sum += samples[end] - samples[end - window];
            if sum > best {
                best = sum;
            }
        }

        watts.push(Some(best / window as f64));
    }

    Some(PowerCurve::from_values(watts, CurveFidelity::Measured))
}

/// Element-wise maximum across curves.
///
/// Shorter curves are padded with unknown values, so they never suppress a
/// longer session's values. Any synthetic input makes the result synthetic.
/// Returns `None` for no input curves.
pub fn merge_curves(curves: &[PowerCurve]) -> Option<PowerCurve> {
    let len = curves.iter().map(PowerCurve::len).max()?;

    let mut watts: Vec<Option<f64>> = vec![None; len];
    let mut fidelity = CurveFidelity::Measured;

    for curve in curves {
        if curve.is_synthetic() {
            fidelity = CurveFidelity::Synthetic;
        }
        for (merged, value) in watts.iter_mut().zip(curve.values()) {
            *merged = match (*merged, *value) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
    }

    Some(PowerCurve::from_values(watts, fidelity))
}

/// Merge curves and truncate the result to a period cap.
pub fn merge_curves_capped(curves: &[PowerCurve], cap_secs: usize) -> Option<PowerCurve> {
    merge_curves(curves).map(|c| c.capped(cap_secs))
}

/// Synthesize an approximate curve from discrete best-effort scalars.
///
/// Known points are the captured best efforts plus the session average at
/// the session duration; durations between them are linearly interpolated
/// and durations below the first point hold its value. The result is tagged
/// [`CurveFidelity::Synthetic`].
pub fn synthesize_curve(
    best_efforts: &BTreeMap<u32, f64>,
    avg_power: Option<f64>,
    duration_secs: u32,
) -> Option<PowerCurve> {
    let len = (duration_secs as usize).min(MAX_CURVE_SECS);
    if len == 0 {
        return None;
    }

    let mut anchors: Vec<(u32, f64)> = best_efforts
        .iter()
        .filter(|&(&d, &p)| d > 0 && (d as usize) <= len && p.is_finite() && p >= 0.0)
        .map(|(&d, &p)| (d, p))
        .collect();

    if let Some(avg) = avg_power.filter(|a| a.is_finite() && *a >= 0.0) {
        if (duration_secs as usize) <= MAX_CURVE_SECS
            && !anchors.iter().any(|(d, _)| *d == duration_secs)
        {
            anchors.push((duration_secs, avg));
        }
    }

    if anchors.is_empty() {
        return None;
    }
    anchors.sort_by_key(|(d, _)| *d);

    let last_duration = anchors[anchors.len() - 1].0 as usize;
    let mut watts = Vec::with_capacity(len);

    for duration in 1..=len as u32 {
        let value = match anchors.iter().position(|(d, _)| *d >= duration) {
            Some(0) => Some(anchors[0].1),
            Some(idx) => {
                let (d0, p0) = anchors[idx - 1];
                let (d1, p1) = anchors[idx];
                let ratio = (duration - d0) as f64 / (d1 - d0) as f64;
                Some(p0 + ratio * (p1 - p0))
            }
            // Beyond the longest known point nothing is invented.
            None => None,
        };
        watts.push(value);
    }

    watts.truncate(last_duration);
    Some(PowerCurve::from_values(watts, CurveFidelity::Synthetic))
}
