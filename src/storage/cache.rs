//! Result cache behind a get/set contract.
//!
//! The engine never depends on how entries are stored: it asks for a value
//! no older than a max-age and writes fresh values back. `SqliteCache`
//! keeps entries across processes; `MemoryCache` serves tests and
//! short-lived callers.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::metrics::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};

/// Cached model results, each with its own max-age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    PowerCurve,
    CriticalPower,
    WPrimeBalance,
    TrainingLoad,
    Vo2max,
    IntensityDistribution,
    ZoneDistribution,
    ZoneBalance,
    EfficiencyTrend,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::PowerCurve => "power_curve",
            ModelKind::CriticalPower => "critical_power",
            ModelKind::WPrimeBalance => "w_prime_balance",
            ModelKind::TrainingLoad => "training_load",
            ModelKind::Vo2max => "vo2max",
            ModelKind::IntensityDistribution => "intensity_distribution",
            ModelKind::ZoneDistribution => "zone_distribution",
            ModelKind::ZoneBalance => "zone_balance",
            ModelKind::EfficiencyTrend => "efficiency_trend",
        };
        f.write_str(name)
    }
}

/// Get/set cache for serialized analytics results.
pub trait AnalyticsCache: Send + Sync {
    /// Value stored under `(scope, key)` if younger than `max_age`.
    fn get(&self, key: &str, scope: &str, max_age: Duration) -> AnalyticsResult<Option<String>>;

    /// Store a value, replacing any previous entry.
    fn set(&self, key: &str, scope: &str, value: &str) -> AnalyticsResult<()>;
}

fn is_fresh(created_at: DateTime<Utc>, max_age: Duration) -> bool {
    Utc::now() - created_at <= max_age
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(String, String), (DateTime<Utc>, String)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<(String, String), (DateTime<Utc>, String)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a value with an explicit creation time.
    pub fn set_at(&self, key: &str, scope: &str, value: &str, created_at: DateTime<Utc>) {
        self.entries()
            .insert((scope.to_string(), key.to_string()), (created_at, value.to_string()));
    }
}

impl AnalyticsCache for MemoryCache {
    fn get(&self, key: &str, scope: &str, max_age: Duration) -> AnalyticsResult<Option<String>> {
        let entries = self.entries();
        Ok(entries
            .get(&(scope.to_string(), key.to_string()))
            .filter(|(created_at, _)| is_fresh(*created_at, max_age))
            .map(|(_, value)| value.clone()))
    }

    fn set(&self, key: &str, scope: &str, value: &str) -> AnalyticsResult<()> {
        self.set_at(key, scope, value, Utc::now());
        Ok(())
    }
}

/// SQLite-backed cache.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open or create a cache database at the given path.
    pub fn open(path: &Path) -> AnalyticsResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AnalyticsError::InvalidInput(format!("cache directory: {e}")))?;
        }

        let cache = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        cache.initialize()?;
        Ok(cache)
    }

    /// Open an in-memory cache (for testing).
    pub fn open_in_memory() -> AnalyticsResult<Self> {
        let cache = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        cache.initialize()?;
        Ok(cache)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn initialize(&self) -> AnalyticsResult<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_VERSION_TABLE)?;

        let version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?;

        if version < CURRENT_VERSION {
            conn.execute_batch(SCHEMA)?;
            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                [CURRENT_VERSION],
            )?;
            tracing::info!("Analytics cache migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    /// Store a value with an explicit creation time.
    pub fn set_at(&self, key: &str, scope: &str, value: &str, created_at: DateTime<Utc>) -> AnalyticsResult<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO analytics_cache (scope, cache_key, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![scope, key, value, stored_timestamp(created_at)],
        )?;
        Ok(())
    }

    /// Drop every entry of a scope (e.g. after new sessions arrive).
    pub fn invalidate_scope(&self, scope: &str) -> AnalyticsResult<usize> {
        let deleted = self
            .conn()
            .execute("DELETE FROM analytics_cache WHERE scope = ?1", params![scope])?;
        Ok(deleted)
    }

    /// Delete entries older than `max_age`.
    pub fn cleanup_expired(&self, max_age: Duration) -> AnalyticsResult<usize> {
        self.cleanup_before(Utc::now() - max_age)
    }

    fn cleanup_before(&self, cutoff: DateTime<Utc>) -> AnalyticsResult<usize> {
        let deleted = self.conn().execute(
            "DELETE FROM analytics_cache WHERE created_at < ?1",
            params![stored_timestamp(cutoff)],
        )?;

        if deleted > 0 {
            tracing::info!("Cleaned up {} expired analytics cache entries", deleted);
        }

        Ok(deleted)
    }
}

/// Fixed-width UTC timestamp, so text order matches time order.
fn stored_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl AnalyticsCache for SqliteCache {
    fn get(&self, key: &str, scope: &str, max_age: Duration) -> AnalyticsResult<Option<String>> {
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT payload, created_at FROM analytics_cache WHERE scope = ?1 AND cache_key = ?2",
                params![scope, key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((payload, created_str)) = row else {
            return Ok(None);
        };

        let created_at = DateTime::parse_from_rfc3339(&created_str)
            .map_err(|e| AnalyticsError::CalculationFailed(format!("bad cache timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(is_fresh(created_at, max_age).then_some(payload))
    }

    fn set(&self, key: &str, scope: &str, value: &str) -> AnalyticsResult<()> {
        self.set_at(key, scope, value, Utc::now())
    }
}
