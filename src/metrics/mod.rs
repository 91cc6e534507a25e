//! Metrics module for session summaries, zones, and analytics.

pub mod analytics;
pub mod calculator;
pub mod smoothing;
pub mod zones;

pub use calculator::{training_stress_score, SessionCalculator, SessionSummary};
pub use zones::{
    zone_balance, zone_distribution, zone_seconds, IntensityBucket, TargetModel, ZoneBalance, ZoneBucket,
    ZoneDistribution, ZoneScheme, ZoneTable,
};

// Re-export key analytics types for convenience
pub use analytics::{
    AnalyticsEngine, AnalyticsError, AnalyticsResult, BestEffort, CriticalPowerModel, EfficiencyTrend,
    FitnessLevel, IntensityDistribution, PowerCurve, TrainingLoadPoint, Vo2maxEstimate, WPrimeBalance,
};
