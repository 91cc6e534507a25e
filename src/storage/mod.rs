//! Storage module for configuration, session access, and the result cache.

pub mod cache;
pub mod config;
pub mod schema;
pub mod session_store;

pub use cache::{AnalyticsCache, MemoryCache, ModelKind, SqliteCache};
pub use config::{
    load_config, load_config_from, save_config, save_config_to, AthleteProfile, CacheSettings, ConfigError,
    EngineConfig, PowerCurveSettings,
};
pub use session_store::{DateRange, MemorySessionStore, SessionStore};
