//! Smoothing and filtering algorithms.
//!
//! Rolling averages for Normalized Power and a centered rolling median for
//! post-filtering estimate sequences.

use std::collections::VecDeque;

/// Rolling average calculator over a fixed sample window.
#[derive(Debug)]
pub struct RollingAverage {
    /// Buffer of recent values
    buffer: VecDeque<f64>,
    /// Window size in samples
    window_size: usize,
    /// Running sum for efficient calculation
    sum: f64,
}

impl RollingAverage {
    /// Create a new rolling average with the given window size.
    pub fn new(window_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            sum: 0.0,
        }
    }

    /// Create a 30-second rolling average (for Normalized Power calculation).
    pub fn thirty_second() -> Self {
        Self::new(30)
    }

    /// Add a new value and return the current average.
    pub fn add(&mut self, value: f64) -> Option<f64> {
        self.buffer.push_back(value);
        self.sum += value;

        if self.buffer.len() > self.window_size {
            if let Some(old) = self.buffer.pop_front() {
                self.sum -= old;
            }
        }

        self.average()
    }

    /// Get the current average without adding a value.
    pub fn average(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.sum / self.buffer.len() as f64)
        }
    }

    /// Check if the buffer is full (has enough samples for a valid average).
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.window_size
    }
}

/// Normalized Power calculation.
///
/// NP = 4th root of average of (30-second rolling average power)^4
#[derive(Debug)]
pub struct NormalizedPowerCalculator {
    /// 30-second rolling average
    rolling_avg: RollingAverage,
    /// Sum of 4th powers
    sum_fourth_power: f64,
    /// Count of samples
    count: u32,
}

impl NormalizedPowerCalculator {
    /// Create a new Normalized Power calculator.
    pub fn new() -> Self {
        Self {
            rolling_avg: RollingAverage::thirty_second(),
            sum_fourth_power: 0.0,
            count: 0,
        }
    }

    /// Add a power sample and return the current NP.
    pub fn add(&mut self, power: f64) -> Option<f64> {
        if let Some(avg) = self.rolling_avg.add(power) {
            // Only count once we have a full 30-second window
            if self.rolling_avg.is_full() {
                self.sum_fourth_power += avg.powi(4);
                self.count += 1;
            }
        }

        self.normalized_power()
    }

    /// Get the current Normalized Power.
    pub fn normalized_power(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }

        let avg_fourth_power = self.sum_fourth_power / self.count as f64;
        Some(avg_fourth_power.powf(0.25))
    }
}

impl Default for NormalizedPowerCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalized Power of a whole 1 Hz power series.
///
/// Missing samples count as zero output. Returns `None` for series shorter
/// than one 30-second window.
pub fn normalized_power(power: &[Option<f64>]) -> Option<f64> {
    let mut calc = NormalizedPowerCalculator::new();
    let mut np = None;
    for sample in power {
        np = calc.add(sample.unwrap_or(0.0));
    }
    np
}

/// Centered rolling median with a minimum period of one.
///
/// Each output is the median of the values within `window / 2` positions on
/// either side, truncated at the sequence edges. Even-sized windows average
/// their two middle values.
pub fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() || window == 0 {
        return values.to_vec();
    }

    let before = (window - 1) / 2;
    let after = window / 2;

    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(values.len());
            median(&values[start..end])
        })
        .collect()
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
