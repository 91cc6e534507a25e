//! Unit tests for config files and the SQLite result cache.

use chrono::{Duration, Utc};
use powerlab::storage::cache::{AnalyticsCache, SqliteCache};
use powerlab::storage::config::{load_config_from, save_config_to, EngineConfig};
use tempfile::tempdir;

#[test]
fn test_missing_config_loads_defaults() {
    let dir = tempdir().unwrap();
    let config = load_config_from(&dir.path().join("missing.toml")).unwrap();

    assert!(config.cache.enabled);
    assert_eq!(config.vo2max.high_intensity_factor, 14.5);
    assert_eq!(config.vo2max.decay_drift_per_day, -0.015);
}

#[test]
fn test_config_roundtrip_through_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = EngineConfig::default();
    config.vo2max.jump_tolerance = 450.0;
    config.power_curve.cap_secs = 1800;
    config.cache.vo2max_minutes = 15;
    save_config_to(&path, &config).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.vo2max, config.vo2max);
    assert_eq!(loaded.power_curve, config.power_curve);
    assert_eq!(loaded.cache, config.cache);
}

#[test]
fn test_malformed_config_is_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[cache\nenabled = ").unwrap();

    assert!(load_config_from(&path).is_err());
}

#[test]
fn test_sqlite_cache_persists_across_connections() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache").join("analytics.db");

    {
        let cache = SqliteCache::open(&path).unwrap();
        cache.set("training_load:2024", "user-1", "[]").unwrap();
    }

    let cache = SqliteCache::open(&path).unwrap();
    assert_eq!(
        cache.get("training_load:2024", "user-1", Duration::hours(1)).unwrap().as_deref(),
        Some("[]")
    );
    assert_eq!(cache.get("training_load:2024", "user-2", Duration::hours(1)).unwrap(), None);

    cache
        .set_at("vo2max:2024", "user-1", "[]", Utc::now() - Duration::hours(2))
        .unwrap();
    assert_eq!(cache.get("vo2max:2024", "user-1", Duration::hours(1)).unwrap(), None);
}
