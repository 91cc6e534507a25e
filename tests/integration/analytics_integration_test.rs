//! Integration tests for the complete analytics pipeline.
//!
//! Tests the end-to-end flow:
//! 1. Simulate rides as decoded record streams
//! 2. Normalize and summarize them into a session store
//! 3. Query every model through the engine and a SQLite cache

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use powerlab::metrics::analytics::critical_power::{estimate_critical_power, w_prime_balance, CriticalPowerModel};
use powerlab::metrics::analytics::pdc::BestEffort;
use powerlab::metrics::analytics::training_load::compute_training_load;
use powerlab::metrics::analytics::vo2max::{GateRejection, Vo2maxEstimator};
use powerlab::metrics::zones::{TargetModel, ZoneScheme};
use powerlab::recording::{normalize_json, normalize_records, RawRecord};
use powerlab::storage::cache::SqliteCache;
use powerlab::{AnalyticsEngine, AthleteProfile, DateRange, EngineConfig, MemorySessionStore, SessionCalculator, SessionSummary};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
}

fn ride_start(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 17, 30, 0).unwrap() + Duration::days(day)
}

/// Simulates 60 minutes with 3x5-min intervals at 120% FTP.
fn simulate_interval_ride(ftp: f64) -> Vec<RawRecord> {
    let mut segments: Vec<(usize, f64, f64)> = vec![(600, ftp * 0.5, 120.0)];
    for interval in 0..3 {
        segments.push((300, ftp * 1.2, 165.0));
        if interval < 2 {
            segments.push((180, ftp * 0.5, 125.0));
        }
    }
    segments.push((1740, ftp * 0.4, 110.0));
    to_records(&segments)
}

/// Simulates 60 minutes of steady endurance riding.
fn simulate_endurance_ride(power: f64, heart_rate: f64) -> Vec<RawRecord> {
    to_records(&[(3600, power, heart_rate)])
}

fn to_records(segments: &[(usize, f64, f64)]) -> Vec<RawRecord> {
    let mut records = Vec::new();
    for &(secs, power, hr) in segments {
        for _ in 0..secs {
            let t = records.len() as f64;
            records.push(RawRecord::at(t).with_power(power).with_heart_rate(hr));
        }
    }
    records
}

#[test]
fn test_full_analytics_pipeline() {
    init_tracing();

    let athlete = AthleteProfile::new(250.0, 70.0, 190.0);
    let user = Uuid::new_v4();
    let store = Arc::new(MemorySessionStore::new());
    let calculator = SessionCalculator::new(athlete.ftp, athlete.max_hr);

    // Step 1-2: two weeks alternating intervals and endurance rides
    let mut interval_ids = Vec::new();
    for day in 0..14 {
        let records = if day % 2 == 0 {
            simulate_interval_ride(athlete.ftp)
        } else {
            simulate_endurance_ride(170.0, 130.0 - day as f64 * 0.5)
        };
        let session = normalize_records(&records);
        assert_eq!(session.len(), 3600);

        let summary = store.ingest(user, ride_start(day), &session, &calculator);
        if day % 2 == 0 {
            interval_ids.push(summary.id);
        }
    }

    // A malformed upload contributes nothing.
    let broken = normalize_json("{\"time\": [0, 1,");
    assert!(broken.is_empty());
    store.ingest(user, ride_start(3), &broken, &calculator);

    let cache = Arc::new(SqliteCache::open_in_memory().unwrap());
    let engine = AnalyticsEngine::new(store, EngineConfig::default()).with_cache(cache);
    let range = DateRange::new(first_day(), first_day() + Duration::days(13));

    // Step 3: power curve from measured series
    let curve = engine.power_curve(user, &athlete, &range).unwrap();
    assert!(!curve.is_synthetic());
    assert_eq!(curve.len(), 3600);
    assert_eq!(curve.power_at(1), Some(300.0));
    assert_eq!(curve.power_at(300), Some(300.0));

    // Critical power and W' balance
    let model = engine.critical_power(user, &athlete, &range).unwrap();
    assert!(model.critical_power_watts > 0.0 && model.w_prime_joules > 0.0);
    assert_eq!(model.durations, vec![180, 300, 600, 1200, 1800]);

    let balance = engine
        .w_prime_balance(user, &athlete, &range, interval_ids[0])
        .unwrap();
    assert_eq!(balance.balance.len(), 3600);
    assert!(balance.depletion_percent > 0.0);
    assert!(balance
        .balance
        .iter()
        .all(|b| *b >= 0.0 && *b <= model.w_prime_joules));

    // Training load: one row per day, TSB exact
    let load = engine.training_load(user, &athlete, &range).unwrap();
    assert_eq!(load.len(), 14);
    for point in &load {
        assert_eq!(point.tsb, point.ctl - point.atl);
        assert!(point.tss > 0.0);
    }
    assert!(load[13].ctl > load[0].ctl);

    // VO2max from the interval rides' 5-minute peak
    let estimates = engine.vo2max(user, &athlete, &range);
    assert_eq!(estimates.len(), 7);
    for estimate in &estimates {
        assert!((45.0..=80.0).contains(&estimate.vo2max_ml_kg_min));
        assert!((estimate.absolute_ml_min - 14.2 * 300.0).abs() < 1e-6);
    }

    // Zones: 15 minutes at 120% FTP per interval ride
    let intensity = engine.intensity_distribution(user, &athlete, &range).unwrap();
    assert!((intensity.vo2_minutes() - 7.0 * 15.0).abs() < 1e-9);

    let power_zones = engine
        .zone_distribution(user, &athlete, &range, ZoneScheme::Power)
        .unwrap();
    assert_eq!(power_zones.total_seconds, 14 * 3600);
    let balance = engine
        .zone_balance(user, &athlete, &range, ZoneScheme::Power, TargetModel::Polarized)
        .unwrap();
    assert_eq!(balance.deviations.len(), 5);

    // Efficiency: only the endurance rides qualify; heart rate drifts down
    let trend = engine.efficiency_trend(user, &athlete, &range).unwrap();
    assert_eq!(trend.points.len(), 7);
    assert!(trend.is_improving());

    // Second queries are served from the cache
    let cached_curve = engine.power_curve(user, &athlete, &range).unwrap();
    assert_eq!(cached_curve.len(), curve.len());
    assert_eq!(cached_curve.power_at(300), Some(300.0));
    let cached_ids: Vec<_> = engine
        .vo2max(user, &athlete, &range)
        .iter()
        .map(|e| e.session_id)
        .collect();
    assert_eq!(cached_ids, estimates.iter().map(|e| e.session_id).collect::<Vec<_>>());
}

#[test]
fn test_forty_two_days_of_constant_load() {
    let first = first_day();
    let entries: Vec<_> = (0..42).map(|d| (first + Duration::days(d), 100.0)).collect();

    let rows = compute_training_load(&entries, first, first + Duration::days(41));
    assert_eq!(rows.len(), 42);
    let last = rows.last().unwrap();
    assert!((55.0..=75.0).contains(&last.ctl), "ctl = {}", last.ctl);
}

#[test]
fn test_critical_power_from_best_efforts() {
    let efforts = vec![
        BestEffort::new(300, 340.0),
        BestEffort::new(600, 310.0),
        BestEffort::new(1200, 280.0),
        BestEffort::new(1800, 265.0),
    ];

    let model = estimate_critical_power(&efforts).unwrap();
    assert!((200.0..=280.0).contains(&model.critical_power_watts));
    assert!(model.w_prime_joules > 0.0);
    assert!(model.r_squared > 0.99);
}

#[test]
fn test_no_depletion_below_critical_power() {
    let model = CriticalPowerModel::from_parameters(220.0, 15000.0);
    let session = vec![Some(200.0); 1200];

    let balance = w_prime_balance(&session, &model).unwrap();
    assert_eq!(balance.min_balance_joules, model.w_prime_joules);
    assert_eq!(balance.depletion_percent, 0.0);
}

#[test]
fn test_vo2max_rejects_low_heart_rate() {
    let estimator = Vo2maxEstimator::new(70.0, 190.0);

    let mut session = SessionSummary::new(Uuid::new_v4(), ride_start(0), 1200);
    session.avg_power = Some(300.0);
    session.normalized_power = Some(320.0);
    session.intensity_factor = Some(1.1);
    session.avg_hr = Some(100.0);
    session.max_hr = Some(160.0);
    session.best_efforts.insert(300, 330.0);
    session.best_efforts.insert(600, 315.0);

    assert!(estimator.estimate(std::slice::from_ref(&session)).is_empty());
    assert_eq!(
        estimator.validate(14.2 * 330.0, &session, &[]),
        Err(GateRejection::HeartRateTooLow)
    );
}

#[test]
fn test_invalid_athlete_returns_absent() {
    let store = Arc::new(MemorySessionStore::new());
    let user = Uuid::new_v4();
    let calculator = SessionCalculator::new(250.0, 190.0);
    let session = normalize_records(&simulate_interval_ride(250.0));
    store.ingest(user, ride_start(0), &session, &calculator);

    let engine = AnalyticsEngine::new(store, EngineConfig::default());
    let range = DateRange::new(first_day(), first_day());
    let zero_ftp = AthleteProfile::new(0.0, 70.0, 190.0);

    assert!(engine.power_curve(user, &zero_ftp, &range).is_none());
    assert!(engine.critical_power(user, &zero_ftp, &range).is_none());
    assert!(engine.training_load(user, &zero_ftp, &range).is_none());
    assert!(engine.efficiency_trend(user, &zero_ftp, &range).is_none());
    assert!(engine.vo2max(user, &zero_ftp, &range).is_empty());

    let valid = AthleteProfile::new(250.0, 70.0, 190.0);
    assert!(engine.power_curve(user, &valid, &range).is_some());
}
