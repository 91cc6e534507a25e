//! Training Load calculations (CTL/ATL/TSB/ACWR).
//!
//! Implements the Performance Management Chart (PMC) model:
//! - CTL (Chronic Training Load): 42-day exponentially weighted moving average
//! - ATL (Acute Training Load): 7-day exponentially weighted moving average
//! - TSB (Training Stress Balance): CTL - ATL
//! - ACWR (Acute:Chronic Workload Ratio): ATL / CTL
//!
//! The recursion is order dependent, so history is always built as a single
//! chronological fold seeded from a 42-day lookback.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Chronic load time constant in days.
pub const CTL_DAYS: f64 = 42.0;

/// Acute load time constant in days.
pub const ATL_DAYS: f64 = 7.0;

/// Days of history used to warm up the recursion before a reporting window.
pub const LOOKBACK_DAYS: i64 = 42;

/// Training load values for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadPoint {
    /// Calendar day.
    pub date: NaiveDate,
    /// Chronic Training Load (fitness).
    pub ctl: f64,
    /// Acute Training Load (fatigue).
    pub atl: f64,
    /// Training Stress Balance (CTL - ATL).
    pub tsb: f64,
    /// Total TSS for the day.
    pub tss: f64,
}

/// Recursion state carried from one day to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadState {
    pub ctl: f64,
    pub atl: f64,
}

/// ACWR status thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcwrStatus {
    /// ACWR < 0.8: Undertrained (detraining risk).
    Undertrained,
    /// ACWR 0.8 - 1.3: Optimal training zone.
    Optimal,
    /// ACWR 1.3 - 1.5: Caution zone.
    Caution,
    /// ACWR > 1.5: High injury risk.
    HighRisk,
}

/// Acute:Chronic Workload Ratio result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acwr {
    /// The ratio value.
    pub ratio: f64,
    /// Status classification.
    pub status: AcwrStatus,
}

/// Sum TSS per calendar day over `[first, last]`.
///
/// Days without sessions are filled with zero. Non-finite or negative TSS
/// values and entries outside the range are dropped.
pub fn daily_tss(entries: &[(NaiveDate, f64)], first: NaiveDate, last: NaiveDate) -> Vec<(NaiveDate, f64)> {
    if first > last {
        return Vec::new();
    }

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for &(date, tss) in entries {
        if !tss.is_finite() || tss < 0.0 || date < first || date > last {
            continue;
        }
        *totals.entry(date).or_insert(0.0) += tss;
    }

    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| (d, totals.get(&d).copied().unwrap_or(0.0)))
        .collect()
}

/// Training load calculator.
#[derive(Debug, Default)]
pub struct TrainingLoadCalculator;

impl TrainingLoadCalculator {
    /// Create a calculator with the fixed 42/7 day constants.
    pub fn new() -> Self {
        Self
    }

    /// Advance the recursion by one day.
    pub fn calculate_day(&self, prev: LoadState, today_tss: f64) -> LoadState {
        LoadState {
            ctl: prev.ctl + (today_tss - prev.ctl) / CTL_DAYS,
            atl: prev.atl + (today_tss - prev.atl) / ATL_DAYS,
        }
    }

    /// Calculate full history from a chronologically ordered daily TSS series.
    pub fn calculate_history(&self, daily_tss: &[(NaiveDate, f64)]) -> Vec<TrainingLoadPoint> {
        daily_tss
            .iter()
            .scan(LoadState::default(), |state, &(date, tss)| {
                *state = self.calculate_day(*state, tss);
                Some(TrainingLoadPoint {
                    date,
                    ctl: state.ctl,
                    atl: state.atl,
                    tsb: state.ctl - state.atl,
                    tss,
                })
            })
            .collect()
    }

    /// Final state after folding a daily TSS series from zero.
    pub fn final_state(&self, daily_tss: &[(NaiveDate, f64)]) -> LoadState {
        daily_tss
            .iter()
            .fold(LoadState::default(), |state, &(_, tss)| self.calculate_day(state, tss))
    }

    /// Calculate ACWR from current ATL/CTL.
    pub fn acwr(&self, atl: f64, ctl: f64) -> Acwr {
        let ratio = if ctl > 0.0 { atl / ctl } else { 0.0 };

        let status = if ratio < 0.8 {
            AcwrStatus::Undertrained
        } else if ratio <= 1.3 {
            AcwrStatus::Optimal
        } else if ratio <= 1.5 {
            AcwrStatus::Caution
        } else {
            AcwrStatus::HighRisk
        };

        Acwr { ratio, status }
    }
}

impl Acwr {
    /// Get recommendation text.
    pub fn recommendation(&self) -> &'static str {
        match self.status {
            AcwrStatus::Undertrained => {
                "Training load is low. Consider increasing training volume gradually."
            }
            AcwrStatus::Optimal => "Training load is in the optimal zone. Keep up the good work!",
            AcwrStatus::Caution => {
                "Training load is elevated. Monitor for signs of fatigue and consider recovery."
            }
            AcwrStatus::HighRisk => {
                "Training load spike detected. High injury risk. Reduce training intensity."
            }
        }
    }
}

/// Training load for each day of `[start, end]`.
///
/// The recursion starts from zero `LOOKBACK_DAYS` before `start` and the
/// warm-up rows are dropped. A range without sessions still yields one
/// zeroed row per day; `start > end` yields nothing.
pub fn compute_training_load(
    entries: &[(NaiveDate, f64)],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<TrainingLoadPoint> {
    if start > end {
        return Vec::new();
    }

    let seed = start - Duration::days(LOOKBACK_DAYS);
    let series = daily_tss(entries, seed, end);
    let history = TrainingLoadCalculator::new().calculate_history(&series);

    tracing::debug!(
        "Training load: {} days from {} ({} warm-up)",
        history.len(),
        seed,
        LOOKBACK_DAYS
    );

    history.into_iter().filter(|p| p.date >= start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
    }

    #[test]
    fn test_single_day_step() {
        let calc = TrainingLoadCalculator::new();
        let state = calc.calculate_day(LoadState::default(), 84.0);

        assert!((state.ctl - 2.0).abs() < 1e-12);
        assert!((state.atl - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_forty_two_days_at_100() {
        let calc = TrainingLoadCalculator::new();
        let series: Vec<_> = (0..42).map(|i| (day(i), 100.0)).collect();
        let history = calc.calculate_history(&series);

        let last = history.last().unwrap();
        // 100 * (1 - (41/42)^42)
        assert!((last.ctl - 63.65).abs() < 0.05);
        assert!((55.0..=75.0).contains(&last.ctl));
        assert_eq!(calc.final_state(&series).ctl, last.ctl);
    }

    #[test]
    fn test_tsb_is_ctl_minus_atl() {
        let calc = TrainingLoadCalculator::new();
        let series: Vec<_> = (0..60)
            .map(|i| (day(i), if i % 3 == 0 { 0.0 } else { 75.0 + i as f64 }))
            .collect();

        for point in calc.calculate_history(&series) {
            assert_eq!(point.tsb, point.ctl - point.atl);
        }
    }

    #[test]
    fn test_constant_load_converges_monotonically() {
        let calc = TrainingLoadCalculator::new();
        let series: Vec<_> = (0..200).map(|i| (day(i), 80.0)).collect();
        let history = calc.calculate_history(&series);

        for pair in history.windows(2) {
            assert!(pair[1].ctl >= pair[0].ctl);
            assert!(pair[1].atl >= pair[0].atl);
            assert!(pair[1].ctl <= 80.0 && pair[1].atl <= 80.0);
        }
        for point in &history {
            assert!(80.0 - point.atl < 80.0 - point.ctl);
        }
    }

    #[test]
    fn test_daily_tss_fills_gaps() {
        let entries = vec![
            (day(0), 50.0),
            (day(0), 30.0),
            (day(2), 60.0),
            (day(2), f64::NAN),
            (day(3), -5.0),
            (day(9), 100.0),
        ];
        let series = daily_tss(&entries, day(0), day(3));

        assert_eq!(series, vec![(day(0), 80.0), (day(1), 0.0), (day(2), 60.0), (day(3), 0.0)]);
    }

    #[test]
    fn test_window_without_sessions_is_zeroed() {
        let rows = compute_training_load(&[], day(50), day(56));
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|r| r.ctl == 0.0 && r.atl == 0.0 && r.tsb == 0.0 && r.tss == 0.0));

        assert!(compute_training_load(&[], day(5), day(4)).is_empty());
    }

    #[test]
    fn test_lookback_seeds_window() {
        // Sessions before the window still shape the first reported day.
        let entries: Vec<_> = (0..42).map(|i| (day(i), 100.0)).collect();
        let rows = compute_training_load(&entries, day(42), day(43));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(42));
        assert_eq!(rows[0].tss, 0.0);
        assert!(rows[0].ctl > 60.0);
    }

    #[test]
    fn test_acwr_thresholds() {
        let calc = TrainingLoadCalculator::new();

        let under = calc.acwr(40.0, 100.0);
        assert_eq!(under.status, AcwrStatus::Undertrained);
        assert!((under.ratio - 0.4).abs() < 1e-9);

        assert_eq!(calc.acwr(100.0, 100.0).status, AcwrStatus::Optimal);
        assert_eq!(calc.acwr(140.0, 100.0).status, AcwrStatus::Caution);
        assert_eq!(calc.acwr(200.0, 100.0).status, AcwrStatus::HighRisk);
        assert_eq!(calc.acwr(10.0, 0.0).ratio, 0.0);

        assert!(calc.acwr(200.0, 100.0).recommendation().contains("injury"));
    }
}
