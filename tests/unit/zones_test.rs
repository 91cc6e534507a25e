//! Unit tests for zone tables, distributions and efficiency.

use chrono::{Duration, TimeZone, Utc};
use powerlab::metrics::analytics::efficiency::efficiency_trend;
use powerlab::metrics::calculator::SessionSummary;
use powerlab::metrics::zones::{
    zone_balance, zone_distribution, zone_seconds, BalanceStatus, IntensityBucket, TargetModel, ZoneScheme,
    ZoneTable,
};
use uuid::Uuid;

fn session_with_zones(day: i64, power: &[u32], hr: &[u32]) -> SessionSummary {
    let start = Utc.with_ymd_and_hms(2024, 2, 1, 18, 0, 0).unwrap() + Duration::days(day);
    let power_table = ZoneTable::coggan_power();
    let hr_table = ZoneTable::max_hr();

    let mut s = SessionSummary::new(Uuid::new_v4(), start, power.iter().sum());
    s.power_zones = power_table
        .bands()
        .iter()
        .zip(power.iter().chain(std::iter::repeat(&0)))
        .map(|(band, secs)| powerlab::metrics::zones::ZoneBucket {
            zone_label: band.label.clone(),
            seconds_in_zone: *secs,
        })
        .collect();
    s.hr_zones = hr_table
        .bands()
        .iter()
        .zip(hr.iter().chain(std::iter::repeat(&0)))
        .map(|(band, secs)| powerlab::metrics::zones::ZoneBucket {
            zone_label: band.label.clone(),
            seconds_in_zone: *secs,
        })
        .collect();
    s
}

#[test]
fn test_canonical_tables_cover_all_fractions() {
    for table in [ZoneTable::coggan_power(), ZoneTable::max_hr()] {
        for step in 0..300 {
            let fraction = step as f64 / 100.0;
            assert!(table.classify(fraction).is_some(), "{fraction}");
        }
        assert!(table.classify(f64::NAN).is_none());
    }
}

#[test]
fn test_zone_seconds_at_boundaries() {
    let table = ZoneTable::coggan_power();
    // 0.55 FTP starts Z2, 1.05 FTP starts Z5
    let series = vec![Some(110.0), Some(109.9), Some(210.0)];
    let buckets = zone_seconds(&series, &table, 200.0);

    assert_eq!(buckets[0].seconds_in_zone, 1);
    assert_eq!(buckets[1].seconds_in_zone, 1);
    assert_eq!(buckets[4].seconds_in_zone, 1);
    assert!(zone_seconds(&series, &table, 0.0).is_empty());
}

#[test]
fn test_distribution_across_sessions() {
    let table = ZoneTable::coggan_power();
    let sessions = vec![
        session_with_zones(0, &[600, 2400, 0, 0, 0, 0, 0], &[]),
        session_with_zones(1, &[0, 1800, 600, 0, 600, 0, 0], &[]),
    ];

    let dist = zone_distribution(&sessions, ZoneScheme::Power, &table).unwrap();
    assert_eq!(dist.total_seconds, 6000);
    assert!((dist.percent("Z1") - 10.0).abs() < 1e-9);
    assert!((dist.percent("Z2") - 70.0).abs() < 1e-9);
    assert!((dist.percent("Z5") - 10.0).abs() < 1e-9);

    let total: f64 = dist.zones.iter().map(|z| z.percent).sum();
    assert!((total - 100.0).abs() < 1e-9);

    assert!(zone_distribution(&sessions, ZoneScheme::HeartRate, &ZoneTable::max_hr()).is_none());
}

#[test]
fn test_polarized_session_mix_is_balanced() {
    let table = ZoneTable::coggan_power();
    let sessions = vec![session_with_zones(0, &[600, 4200, 300, 300, 300, 200, 100], &[])];

    let dist = zone_distribution(&sessions, ZoneScheme::Power, &table).unwrap();
    let balance = zone_balance(&dist, &table, TargetModel::Polarized);
    assert!(balance.is_balanced());

    let sweet_spot = zone_balance(&dist, &table, TargetModel::SweetSpot);
    let aerobic = sweet_spot
        .deviations
        .iter()
        .find(|d| d.bucket == IntensityBucket::Aerobic)
        .unwrap();
    assert_eq!(aerobic.status, BalanceStatus::Excess);
    assert!((aerobic.deviation - 25.0).abs() < 1e-9);
}

#[test]
fn test_efficiency_excludes_hard_sessions() {
    let mut sessions = Vec::new();
    for day in 0..8 {
        let mut s = session_with_zones(day, &[3600], &[]);
        s.normalized_power = Some(180.0 + day as f64);
        s.avg_hr = Some(140.0);
        s.intensity_factor = Some(if day == 7 { 0.9 } else { 0.7 });
        sessions.push(s);
    }

    let trend = efficiency_trend(&sessions).unwrap();
    assert_eq!(trend.points.len(), 7);
    assert!((trend.early_mean - 181.0 / 140.0).abs() < 1e-12);
    assert!((trend.recent_mean - 185.0 / 140.0).abs() < 1e-12);
    assert!(trend.is_improving());
}
