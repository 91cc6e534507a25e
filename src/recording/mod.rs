//! Recording module: decoded session streams and their 1 Hz normalization.

pub mod normalizer;
pub mod types;

pub use normalizer::{normalize_json, normalize_records, normalize_stream, MAX_SESSION_SECS};
pub use types::{NormalizedSession, RawRecord, SessionInput, StreamPayload, MIN_POWER_SAMPLES};
