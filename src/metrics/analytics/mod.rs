//! Training analytics models.
//!
//! This module provides:
//! - Power Duration Curve (PDC) extraction, merging and synthesis
//! - Critical Power / W' model and W' balance
//! - Training Load (CTL/ATL/TSB/ACWR)
//! - VO2max estimation and intensity distribution
//! - Aerobic efficiency trend
//! - An engine running each model over a session store with caching

pub mod critical_power;
pub mod efficiency;
pub mod engine;
pub mod error;
pub mod pdc;
pub mod training_load;
pub mod vo2max;

// Re-exports for convenience
pub use critical_power::{estimate_critical_power, w_prime_balance, CriticalPowerModel, WPrimeBalance};
pub use efficiency::{efficiency_trend, EfficiencyPoint, EfficiencyTrend};
pub use engine::AnalyticsEngine;
pub use error::{AnalyticsError, AnalyticsResult};
pub use pdc::{
    compute_session_curve, merge_curves, merge_curves_capped, synthesize_curve, BestEffort, CurveFidelity,
    PowerCurve,
};
pub use training_load::{
    compute_training_load, daily_tss, Acwr, AcwrStatus, TrainingLoadCalculator, TrainingLoadPoint,
};
pub use vo2max::{
    intensity_distribution, FitnessLevel, IntensityDistribution, Vo2maxCalibration, Vo2maxEstimate,
    Vo2maxEstimator, Vo2maxMethod,
};
