//! Per-model entry points over a session store and a result cache.
//!
//! Every call takes a user, the athlete's physiological parameters, and a
//! date range. Results go through get/compute/set on the cache with the
//! model's configured max-age. Invalid athlete parameters yield the absent
//! result without touching the store.

use std::sync::Arc;

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::critical_power::{estimate_critical_power, w_prime_balance, CriticalPowerModel, WPrimeBalance};
use super::efficiency::{efficiency_trend, EfficiencyTrend};
use super::pdc::{compute_session_curve, merge_curves_capped, synthesize_curve, BestEffort, PowerCurve};
use super::training_load::{compute_training_load, TrainingLoadPoint, LOOKBACK_DAYS};
use super::vo2max::{intensity_distribution, IntensityDistribution, Vo2maxEstimate, Vo2maxEstimator};
use crate::metrics::calculator::SessionSummary;
use crate::metrics::zones::{zone_balance, zone_distribution, TargetModel, ZoneBalance, ZoneDistribution, ZoneScheme, ZoneTable};
use crate::recording::MIN_POWER_SAMPLES;
use crate::storage::cache::{AnalyticsCache, ModelKind};
use crate::storage::config::{AthleteProfile, EngineConfig};
use crate::storage::session_store::{DateRange, SessionStore};

/// Shortest best effort used in the CP fit (seconds).
const CP_MIN_DURATION_SECS: u32 = 120;

/// Longest best effort used in the CP fit (seconds).
const CP_MAX_DURATION_SECS: u32 = 1800;

/// Analytics over one session store.
pub struct AnalyticsEngine {
    store: Arc<dyn SessionStore>,
    cache: Option<Arc<dyn AnalyticsCache>>,
    config: EngineConfig,
    power_table: ZoneTable,
    hr_table: ZoneTable,
}

impl AnalyticsEngine {
    /// Create an engine without a cache, using the canonical zone tables.
    pub fn new(store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        Self {
            store,
            cache: None,
            config,
            power_table: ZoneTable::coggan_power(),
            hr_table: ZoneTable::max_hr(),
        }
    }

    /// Attach a result cache.
    pub fn with_cache(mut self, cache: Arc<dyn AnalyticsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the zone tables.
    pub fn with_zone_tables(mut self, power_table: ZoneTable, hr_table: ZoneTable) -> Self {
        self.power_table = power_table;
        self.hr_table = hr_table;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn table(&self, scheme: ZoneScheme) -> &ZoneTable {
        match scheme {
            ZoneScheme::Power => &self.power_table,
            ZoneScheme::HeartRate => &self.hr_table,
        }
    }

    /// Merged best-effort curve over the range.
    ///
    /// Sessions with a stored power series contribute a measured curve;
    /// the rest fall back to a curve synthesized from their best efforts.
    /// Sessions with neither contribute nothing.
    pub fn power_curve(&self, user_id: Uuid, athlete: &AthleteProfile, range: &DateRange) -> Option<PowerCurve> {
        if !valid_athlete(athlete) {
            return None;
        }

        self.cached(ModelKind::PowerCurve, user_id, athlete, range, "", || {
            let sessions = self.store.sessions(user_id, range);
            let curves = self.session_curves(&sessions);
            tracing::debug!(
                "Power curve: {} curves from {} sessions",
                curves.len(),
                sessions.len()
            );
            merge_curves_capped(&curves, self.config.power_curve.cap_secs as usize)
        })
    }

    fn session_curves(&self, sessions: &[SessionSummary]) -> Vec<PowerCurve> {
        let curve_for = |session: &SessionSummary| -> Option<PowerCurve> {
            let measured = self
                .store
                .power_series(session.id)
                .filter(|series| series.iter().flatten().count() >= MIN_POWER_SAMPLES)
                .and_then(|series| compute_session_curve(&series));
            if measured.is_some() {
                return measured;
            }
            // An average alone is not enough to shape a curve.
            if session.best_efforts.is_empty() {
                return None;
            }
            synthesize_curve(&session.best_efforts, session.avg_power, session.duration_secs)
        };

        if self.config.power_curve.parallel {
            sessions.par_iter().filter_map(curve_for).collect()
        } else {
            sessions.iter().filter_map(curve_for).collect()
        }
    }

    /// CP model fitted to the best 2 to 30 minute efforts in the range.
    pub fn critical_power(
        &self,
        user_id: Uuid,
        athlete: &AthleteProfile,
        range: &DateRange,
    ) -> Option<CriticalPowerModel> {
        if !valid_athlete(athlete) {
            return None;
        }

        self.cached(ModelKind::CriticalPower, user_id, athlete, range, "", || {
            let efforts: Vec<BestEffort> = self
                .store
                .sessions(user_id, range)
                .iter()
                .flat_map(|s| s.best_efforts.iter())
                .filter(|(d, _)| (CP_MIN_DURATION_SECS..=CP_MAX_DURATION_SECS).contains(*d))
                .map(|(&d, &p)| BestEffort::new(d, p))
                .collect();
            estimate_critical_power(&efforts)
        })
    }

    /// W' balance of one session against the CP model of the range.
    pub fn w_prime_balance(
        &self,
        user_id: Uuid,
        athlete: &AthleteProfile,
        range: &DateRange,
        session_id: Uuid,
    ) -> Option<WPrimeBalance> {
        if !valid_athlete(athlete) {
            return None;
        }

        let extra = session_id.to_string();
        self.cached(ModelKind::WPrimeBalance, user_id, athlete, range, &extra, || {
            let model = self.critical_power(user_id, athlete, range)?;
            let series = self.store.power_series(session_id)?;
            w_prime_balance(&series, &model)
        })
    }

    /// CTL/ATL/TSB for each day in the range.
    ///
    /// Seeded from a 42-day lookback; a range without sessions yields zero
    /// rows rather than nothing.
    pub fn training_load(
        &self,
        user_id: Uuid,
        athlete: &AthleteProfile,
        range: &DateRange,
    ) -> Option<Vec<TrainingLoadPoint>> {
        if !valid_athlete(athlete) {
            return None;
        }

        self.cached(ModelKind::TrainingLoad, user_id, athlete, range, "", || {
            let entries: Vec<_> = self
                .store
                .sessions(user_id, &range.with_lookback(LOOKBACK_DAYS))
                .iter()
                .filter_map(|s| s.tss_for(athlete.ftp).map(|tss| (s.date(), tss)))
                .collect();
            Some(compute_training_load(&entries, range.start, range.end))
        })
    }

    /// VO2max estimates for sessions in the range.
    pub fn vo2max(&self, user_id: Uuid, athlete: &AthleteProfile, range: &DateRange) -> Vec<Vo2maxEstimate> {
        if !valid_athlete(athlete) {
            return Vec::new();
        }

        self.cached(ModelKind::Vo2max, user_id, athlete, range, "", || {
            let sessions = self.store.sessions(user_id, range);
            Vo2maxEstimator::with_calibration(athlete.weight_kg, athlete.max_hr, self.config.vo2max.clone())
                .estimate(&sessions)
        })
    }

    /// Time per intensity class over the range.
    pub fn intensity_distribution(
        &self,
        user_id: Uuid,
        athlete: &AthleteProfile,
        range: &DateRange,
    ) -> Option<IntensityDistribution> {
        if !valid_athlete(athlete) {
            return None;
        }

        self.cached(ModelKind::IntensityDistribution, user_id, athlete, range, "", || {
            let sessions = self.store.sessions(user_id, range);
            let distribution = intensity_distribution(&sessions, &self.power_table, &self.hr_table);
            (distribution.total_seconds() > 0).then_some(distribution)
        })
    }

    /// Time-in-zone distribution over the range.
    pub fn zone_distribution(
        &self,
        user_id: Uuid,
        athlete: &AthleteProfile,
        range: &DateRange,
        scheme: ZoneScheme,
    ) -> Option<ZoneDistribution> {
        if !valid_athlete(athlete) {
            return None;
        }

        let extra = format!("{scheme:?}");
        self.cached(ModelKind::ZoneDistribution, user_id, athlete, range, &extra, || {
            let sessions = self.store.sessions(user_id, range);
            zone_distribution(&sessions, scheme, self.table(scheme))
        })
    }

    /// Zone distribution compared against a target model.
    pub fn zone_balance(
        &self,
        user_id: Uuid,
        athlete: &AthleteProfile,
        range: &DateRange,
        scheme: ZoneScheme,
        model: TargetModel,
    ) -> Option<ZoneBalance> {
        if !valid_athlete(athlete) {
            return None;
        }

        let extra = format!("{scheme:?}:{model:?}");
        self.cached(ModelKind::ZoneBalance, user_id, athlete, range, &extra, || {
            let distribution = self.zone_distribution(user_id, athlete, range, scheme)?;
            Some(zone_balance(&distribution, self.table(scheme), model))
        })
    }

    /// Aerobic efficiency trend over the range.
    pub fn efficiency_trend(
        &self,
        user_id: Uuid,
        athlete: &AthleteProfile,
        range: &DateRange,
    ) -> Option<EfficiencyTrend> {
        if !valid_athlete(athlete) {
            return None;
        }

        self.cached(ModelKind::EfficiencyTrend, user_id, athlete, range, "", || {
            efficiency_trend(&self.store.sessions(user_id, range))
        })
    }

    /// Get a fresh cached value or compute and store it.
    ///
    /// Cache failures are logged and fall through to computing.
    fn cached<T, F>(
        &self,
        kind: ModelKind,
        user_id: Uuid,
        athlete: &AthleteProfile,
        range: &DateRange,
        extra: &str,
        compute: F,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let cache = match &self.cache {
            Some(cache) if self.config.cache.enabled => cache,
            _ => return compute(),
        };

        let key = cache_key(kind, athlete, range, extra);
        let scope = user_id.to_string();

        match cache.get(&key, &scope, self.config.cache.max_age(kind)) {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(value) => {
                    tracing::debug!("Cache hit for {}", key);
                    return value;
                }
                Err(e) => tracing::warn!("Discarding unreadable cache entry {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let value = compute();

        match serde_json::to_string(&value) {
            Ok(payload) => {
                if let Err(e) = cache.set(&key, &scope, &payload) {
                    tracing::warn!("Cache write failed for {}: {}", key, e);
                }
            }
            Err(e) => tracing::warn!("Could not serialize {} result: {}", kind, e),
        }

        value
    }
}

fn valid_athlete(athlete: &AthleteProfile) -> bool {
    match athlete.validate() {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Skipping analytics: {}", e);
            false
        }
    }
}

fn cache_key(kind: ModelKind, athlete: &AthleteProfile, range: &DateRange, extra: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        kind, range.start, range.end, athlete.ftp, athlete.weight_kg, athlete.max_hr, extra
    )
}
