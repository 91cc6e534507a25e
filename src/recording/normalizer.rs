//! Sample stream normalization onto a 1 Hz grid.
//!
//! Turns irregular, gappy record streams into two equal-length channels
//! indexed by whole seconds from session start. Gaps are linearly
//! interpolated between the surrounding known samples; a channel's edge
//! values are held, never extrapolated past the session span.

use super::types::{NormalizedSession, RawRecord, SessionInput, StreamPayload};

/// Longest session span accepted onto the grid (24 hours).
pub const MAX_SESSION_SECS: usize = 86_400;

/// One timestamped sample of a single channel.
type Point = (f64, f64);

/// Normalize a per-record sequence.
pub fn normalize_records(records: &[RawRecord]) -> NormalizedSession {
    if records.is_empty() {
        return NormalizedSession::empty();
    }

    let origin = records.iter().find_map(|r| r.timestamp);

    let mut power = Vec::new();
    let mut heart_rate = Vec::new();
    let mut times = Vec::new();
    let mut last_time = f64::NEG_INFINITY;

    for (index, record) in records.iter().enumerate() {
        let elapsed = match (origin, record.timestamp) {
            (Some(start), Some(ts)) => (ts - start).num_milliseconds() as f64 / 1000.0,
            // Timestamped stream with an untimed record: not placeable.
            (Some(_), None) => match record.elapsed {
                Some(e) => e,
                None => continue,
            },
            (None, _) => record.elapsed.unwrap_or(index as f64),
        };

        if !elapsed.is_finite() || elapsed < 0.0 || elapsed < last_time {
            tracing::debug!("Dropping out-of-order record at index {}", index);
            continue;
        }
        last_time = elapsed;
        times.push(elapsed);

        if let Some(p) = record.power.filter(|v| valid_channel_value(*v)) {
            power.push((elapsed, p));
        }
        if let Some(hr) = record.heart_rate.filter(|v| valid_channel_value(*v)) {
            heart_rate.push((elapsed, hr));
        }
    }

    build_session(&times, &power, &heart_rate)
}

/// Normalize a provider stream payload.
pub fn normalize_stream(stream: &StreamPayload) -> NormalizedSession {
    if stream.time.is_empty() {
        return NormalizedSession::empty();
    }

    let mut times = Vec::with_capacity(stream.time.len());
    let mut power = Vec::new();
    let mut heart_rate = Vec::new();
    let mut last_time = f64::NEG_INFINITY;

    for (index, &t) in stream.time.iter().enumerate() {
        if !t.is_finite() || t < 0.0 || t < last_time {
            tracing::debug!("Dropping out-of-order stream sample at index {}", index);
            continue;
        }
        last_time = t;
        times.push(t);

        if let Some(p) = channel_value(stream.watts.as_deref(), index) {
            power.push((t, p));
        }
        if let Some(hr) = channel_value(stream.heartrate.as_deref(), index) {
            heart_rate.push((t, hr));
        }
    }

    // Provider streams may start at a non-zero offset.
    let offset = times.first().copied().unwrap_or(0.0);
    let shift = |points: Vec<Point>| -> Vec<Point> {
        points.into_iter().map(|(t, v)| (t - offset, v)).collect()
    };
    let times: Vec<f64> = times.into_iter().map(|t| t - offset).collect();

    build_session(&times, &shift(power), &shift(heart_rate))
}

/// Normalize JSON input, either a record array or a stream object.
///
/// Unparseable input yields an empty session rather than an error.
pub fn normalize_json(json: &str) -> NormalizedSession {
    match serde_json::from_str::<SessionInput>(json) {
        Ok(SessionInput::Records(records)) => normalize_records(&records),
        Ok(SessionInput::Stream(stream)) => normalize_stream(&stream),
        Err(e) => {
            tracing::warn!("Unparseable session input: {}", e);
            NormalizedSession::empty()
        }
    }
}

fn valid_channel_value(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn channel_value(channel: Option<&[Option<f64>]>, index: usize) -> Option<f64> {
    channel
        .and_then(|values| values.get(index).copied().flatten())
        .filter(|v| valid_channel_value(*v))
}

fn build_session(times: &[f64], power: &[Point], heart_rate: &[Point]) -> NormalizedSession {
    let Some(&last) = times.last() else {
        return NormalizedSession::empty();
    };

    if last >= MAX_SESSION_SECS as f64 {
        tracing::warn!(
            "Session spans {}s, over the {}s limit; treating as no data",
            last,
            MAX_SESSION_SECS
        );
        return NormalizedSession::empty();
    }
    let seconds = last.floor() as usize + 1;

    NormalizedSession {
        power: resample(power, seconds),
        heart_rate: resample(heart_rate, seconds),
        recorded_power_samples: power.len(),
    }
}

/// Resample one channel onto `0..seconds`.
///
/// A channel without any known point stays absent for every second.
fn resample(points: &[Point], seconds: usize) -> Vec<Option<f64>> {
    if points.is_empty() {
        return vec![None; seconds];
    }

    let mut grid = Vec::with_capacity(seconds);
    let mut cursor = 0;

    for second in 0..seconds {
        let t = second as f64;

        // Advance to the last point at or before t.
        while cursor + 1 < points.len() && points[cursor + 1].0 <= t {
            cursor += 1;
        }

        let (t0, v0) = points[cursor];
        let value = if t <= t0 {
            // Before the first known sample: hold it.
            v0
        } else if let Some(&(t1, v1)) = points.get(cursor + 1) {
            if t1 > t0 {
                v0 + (v1 - v0) * (t - t0) / (t1 - t0)
            } else {
                v1
            }
        } else {
            // Past the last known sample: hold it.
            v0
        };

        grid.push(Some(value));
    }

    grid
}
