//! Critical Power / W' Model calculation.
//!
//! The CP model provides:
//! - Critical Power (CP): The highest power sustainable without exhaustion
//! - W' (W-prime): Anaerobic work capacity in joules
//! - Time-to-exhaustion predictions at any power above CP
//! - W' balance simulation across a session's power trace

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{AnalyticsError, AnalyticsResult};
use super::pdc::BestEffort;

/// Minimum distinct durations for a fit.
pub const MIN_CP_DURATIONS: usize = 3;

/// Minimum valid samples for a W' balance simulation.
pub const MIN_BALANCE_SAMPLES: usize = 300;

/// W' recovery time constant in seconds.
pub const W_PRIME_TAU_SECS: f64 = 300.0;

/// Critical Power model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPowerModel {
    /// Critical Power in watts.
    pub critical_power_watts: f64,
    /// W' (anaerobic capacity) in joules.
    pub w_prime_joules: f64,
    /// Durations used for the fit (seconds, ascending).
    pub durations: Vec<u32>,
    /// Best power observed at each duration.
    pub actual: Vec<f64>,
    /// Model power at each duration: W'/t + CP.
    pub predicted: Vec<f64>,
    /// Fit quality (R² of the work-time regression).
    pub r_squared: f64,
}

/// Estimate CP and W' from best-effort history.
///
/// Keeps the highest power per duration, fits `P·t = W' + CP·t` by ordinary
/// least squares, and clamps both coefficients to be non-negative. Returns
/// `None` with fewer than three usable durations or a non-finite fit.
pub fn estimate_critical_power(best_efforts: &[BestEffort]) -> Option<CriticalPowerModel> {
    match fit_critical_power(best_efforts) {
        Ok(model) => Some(model),
        Err(e) => {
            tracing::debug!("Critical power fit rejected: {}", e);
            None
        }
    }
}

/// Fit variant that reports why no model was produced.
pub fn fit_critical_power(best_efforts: &[BestEffort]) -> AnalyticsResult<CriticalPowerModel> {
    let mut best: BTreeMap<u32, f64> = BTreeMap::new();
    for effort in best_efforts {
        if effort.duration_secs == 0 || !effort.power_watts.is_finite() || effort.power_watts <= 0.0 {
            continue;
        }
        let entry = best.entry(effort.duration_secs).or_insert(effort.power_watts);
        *entry = entry.max(effort.power_watts);
    }

    if best.len() < MIN_CP_DURATIONS {
        return Err(AnalyticsError::InsufficientData(format!(
            "need at least {} distinct durations, got {}",
            MIN_CP_DURATIONS,
            best.len()
        )));
    }

    // Transform to linear form: work = CP × time + W'
    let work_time_pairs: Vec<(f64, f64)> = best
        .iter()
        .map(|(&d, &p)| (d as f64, p * d as f64))
        .collect();

    let (slope, intercept, r_squared) = linear_regression(&work_time_pairs)?;

    if !slope.is_finite() || !intercept.is_finite() {
        return Err(AnalyticsError::CalculationFailed(
            "non-finite regression coefficients".to_string(),
        ));
    }

    let critical_power_watts = slope.max(0.0);
    let w_prime_joules = intercept.max(0.0);

    let durations: Vec<u32> = best.keys().copied().collect();
    let actual: Vec<f64> = best.values().copied().collect();
    let predicted = durations
        .iter()
        .map(|&d| w_prime_joules / d as f64 + critical_power_watts)
        .collect();

    Ok(CriticalPowerModel {
        critical_power_watts,
        w_prime_joules,
        durations,
        actual,
        predicted,
        r_squared,
    })
}

impl CriticalPowerModel {
    /// Create a model from known parameters.
    pub fn from_parameters(critical_power_watts: f64, w_prime_joules: f64) -> Self {
        Self {
            critical_power_watts: critical_power_watts.max(0.0),
            w_prime_joules: w_prime_joules.max(0.0),
            durations: Vec::new(),
            actual: Vec::new(),
            predicted: Vec::new(),
            r_squared: 1.0,
        }
    }

    /// Check whether both parameters are usable for simulation.
    pub fn is_valid(&self) -> bool {
        self.critical_power_watts.is_finite()
            && self.w_prime_joules.is_finite()
            && self.critical_power_watts > 0.0
            && self.w_prime_joules > 0.0
    }

    /// Predict time to exhaustion at given power.
    /// Returns None if power <= CP (theoretically infinite) or the time
    /// does not fit a `Duration`.
    pub fn time_to_exhaustion(&self, power_watts: f64) -> Option<Duration> {
        if power_watts.is_nan() || power_watts <= self.critical_power_watts {
            return None;
        }

        let tte_secs = self.w_prime_joules / (power_watts - self.critical_power_watts);
        Duration::try_from_secs_f64(tte_secs).ok()
    }

    /// Predict sustainable power for given duration.
    pub fn power_at_duration(&self, duration: Duration) -> Option<f64> {
        let secs = duration.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }

        Some(self.critical_power_watts + self.w_prime_joules / secs)
    }
}

/// Result of a W' balance simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WPrimeBalance {
    /// Lowest balance reached (joules).
    pub min_balance_joules: f64,
    /// Balance at the end of the session (joules).
    pub end_balance_joules: f64,
    /// Deepest depletion as percent of W'.
    pub depletion_percent: f64,
    /// Balance after each second.
    pub balance: Vec<f64>,
}

/// Simulate W' balance across a 1 Hz power series.
///
/// Above CP the excess work is drawn from the balance; at or below CP it
/// recovers exponentially toward W' with a 300-second time constant. The
/// balance stays within `[0, W']` every second. Missing samples recover like
/// zero output. Requires 300 valid samples and a valid model.
pub fn w_prime_balance(power: &[Option<f64>], model: &CriticalPowerModel) -> Option<WPrimeBalance> {
    if !model.is_valid() {
        tracing::debug!("W' balance skipped: invalid CP model");
        return None;
    }

    let valid = power.iter().filter(|p| p.is_some()).count();
    if valid < MIN_BALANCE_SAMPLES {
        tracing::debug!("W' balance skipped: {} valid samples", valid);
        return None;
    }

    let cp = model.critical_power_watts;
    let w_prime = model.w_prime_joules;
    let recovery_rate = 1.0 - (-1.0 / W_PRIME_TAU_SECS).exp();

    let mut balance = w_prime;
    let mut min_balance = w_prime;
    let mut trace = Vec::with_capacity(power.len());

    for sample in power {
        let watts = sample.unwrap_or(0.0);
        if watts > cp {
            balance -= watts - cp;
        } else {
            balance += (w_prime - balance) * recovery_rate;
        }
        balance = balance.clamp(0.0, w_prime);
        min_balance = min_balance.min(balance);
        trace.push(balance);
    }

    Some(WPrimeBalance {
        min_balance_joules: min_balance,
        end_balance_joules: balance,
        depletion_percent: (w_prime - min_balance) / w_prime * 100.0,
        balance: trace,
    })
}

/// Linear regression on (x, y) pairs.
/// Returns (slope, intercept, r_squared).
fn linear_regression(points: &[(f64, f64)]) -> AnalyticsResult<(f64, f64, f64)> {
    let n = points.len() as f64;
    if n < 2.0 {
        return Err(AnalyticsError::CalculationFailed(
            "Need at least 2 points for regression".to_string(),
        ));
    }

    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-10 {
        return Err(AnalyticsError::CalculationFailed(
            "Singular matrix in regression".to_string(),
        ));
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| {
            let predicted = slope * x + intercept;
            (y - predicted).powi(2)
        })
        .sum();

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    Ok((slope, intercept, r_squared))
}
