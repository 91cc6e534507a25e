//! Database schema definitions for the analytics cache.

/// SQL schema for creating all cache tables.
pub const SCHEMA: &str = r#"
-- Cached analytics results, one row per (scope, key)
CREATE TABLE IF NOT EXISTS analytics_cache (
    scope TEXT NOT NULL,
    cache_key TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (scope, cache_key)
);

CREATE INDEX IF NOT EXISTS idx_analytics_cache_created ON analytics_cache(created_at);
"#;

/// Schema version tracking table
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;
