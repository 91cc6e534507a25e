//! Unit test modules.

mod config_cache_test;
mod normalizer_test;
mod power_curve_test;
mod zones_test;
