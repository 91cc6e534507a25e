//! Aerobic efficiency factor (NP / average HR) and its trend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::calculator::SessionSummary;

/// Sessions at or above this intensity factor are not aerobic-only.
pub const MAX_AEROBIC_IF: f64 = 0.75;

/// Heart rates at or below this are treated as degenerate.
pub const MIN_EFFICIENCY_HR: f64 = 60.0;

/// Sessions averaged at each end of the trend.
pub const TREND_WINDOW: usize = 3;

/// Qualifying sessions needed for a trend, so the two ends never share a session.
pub const MIN_TREND_SESSIONS: usize = TREND_WINDOW * 2;

/// Efficiency factor of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyPoint {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Normalized Power divided by average heart rate
    pub efficiency_factor: f64,
}

/// Efficiency factor history with early vs. recent comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyTrend {
    /// Qualifying sessions, oldest first
    pub points: Vec<EfficiencyPoint>,
    /// Mean EF of the earliest sessions
    pub early_mean: f64,
    /// Mean EF of the most recent sessions
    pub recent_mean: f64,
    /// Percent change from early to recent
    pub trend_percent: f64,
}

impl EfficiencyTrend {
    /// True when aerobic efficiency went up.
    pub fn is_improving(&self) -> bool {
        self.trend_percent > 0.0
    }
}

/// Efficiency factor of a session, if it qualifies.
pub fn efficiency_factor(session: &SessionSummary) -> Option<f64> {
    let intensity = session.intensity_factor?;
    let hr = session.avg_hr?;
    let np = session.normalized_power?;
    if intensity >= MAX_AEROBIC_IF || hr <= MIN_EFFICIENCY_HR {
        return None;
    }
    let ef = np / hr;
    ef.is_finite().then_some(ef)
}

/// Efficiency trend over aerobic-only sessions.
///
/// Compares the mean of the earliest three qualifying sessions to the mean
/// of the most recent three. Three sessions would be enough to compute both
/// means, but they would overlap and report no change; this requires
/// [`MIN_TREND_SESSIONS`] instead.
pub fn efficiency_trend(sessions: &[SessionSummary]) -> Option<EfficiencyTrend> {
    let mut points: Vec<EfficiencyPoint> = sessions
        .iter()
        .filter_map(|s| {
            efficiency_factor(s).map(|ef| EfficiencyPoint {
                session_id: s.id,
                timestamp: s.start,
                efficiency_factor: ef,
            })
        })
        .collect();

    if points.len() < MIN_TREND_SESSIONS {
        tracing::debug!("Efficiency trend skipped: {} qualifying sessions", points.len());
        return None;
    }

    points.sort_by_key(|p| p.timestamp);

    let mean = |slice: &[EfficiencyPoint]| {
        slice.iter().map(|p| p.efficiency_factor).sum::<f64>() / slice.len() as f64
    };
    let early_mean = mean(&points[..TREND_WINDOW]);
    let recent_mean = mean(&points[points.len() - TREND_WINDOW..]);
    if early_mean <= 0.0 {
        return None;
    }

    Some(EfficiencyTrend {
        trend_percent: (recent_mean - early_mean) / early_mean * 100.0,
        points,
        early_mean,
        recent_mean,
    })
}
