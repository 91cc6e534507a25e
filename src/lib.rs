//! PowerLab - Training & Power Analytics Engine
//!
//! Turns per-second power and heart-rate recordings of cycling sessions into
//! power-duration curves, a critical power model with W' balance, CTL/ATL/TSB
//! training load, VO2max estimates, and zone and efficiency analysis.
//!
//! Raw recordings go through [`recording`] to become 1 Hz sessions,
//! [`metrics::SessionCalculator`] summarizes each session once at ingestion,
//! and [`metrics::AnalyticsEngine`] answers per-model queries from stored
//! summaries through a result cache.

pub mod metrics;
pub mod recording;
pub mod storage;

// Re-export commonly used types
pub use metrics::analytics::AnalyticsEngine;
pub use metrics::calculator::{SessionCalculator, SessionSummary};
pub use recording::{normalize_json, normalize_records, normalize_stream, NormalizedSession};
pub use storage::config::{AthleteProfile, EngineConfig};
pub use storage::session_store::{DateRange, MemorySessionStore, SessionStore};
