//! Read-only access to ingested sessions.
//!
//! The engine consumes session summaries and, when available, the 1 Hz
//! power series of a session. Where they live is up to the implementation.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::calculator::{SessionCalculator, SessionSummary};
use crate::recording::NormalizedSession;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` days ending on `end`.
    pub fn last_days(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - Duration::days(days.max(1) - 1),
            end,
        }
    }

    /// True when `start > end`.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Same range extended backwards by `days`.
    pub fn with_lookback(&self, days: i64) -> Self {
        Self {
            start: self.start - Duration::days(days),
            end: self.end,
        }
    }
}

/// Source of session data for one or more users.
pub trait SessionStore: Send + Sync {
    /// Session summaries of a user that started within the range.
    fn sessions(&self, user_id: Uuid, range: &DateRange) -> Vec<SessionSummary>;

    /// Full 1 Hz power series of a session, if it was kept.
    fn power_series(&self, session_id: Uuid) -> Option<Vec<Option<f64>>>;
}

#[derive(Debug, Default)]
struct StoreInner {
    summaries: HashMap<Uuid, Vec<SessionSummary>>,
    series: HashMap<Uuid, Vec<Option<f64>>>,
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: RwLock<StoreInner>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a pre-computed summary without a power series.
    pub fn insert_summary(&self, user_id: Uuid, summary: SessionSummary) {
        self.write().summaries.entry(user_id).or_default().push(summary);
    }

    /// Summarize a normalized session.
    ///
    /// The power series is kept only when it holds enough recorded power
    /// for a curve.
    pub fn ingest(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        session: &NormalizedSession,
        calculator: &SessionCalculator,
    ) -> SessionSummary {
        let summary = calculator.summarize(Uuid::new_v4(), start, session);

        let mut inner = self.write();
        if session.has_power_curve_data() {
            inner.series.insert(summary.id, session.power.clone());
        }
        inner.summaries.entry(user_id).or_default().push(summary.clone());

        summary
    }

    /// Total sessions across users.
    pub fn len(&self) -> usize {
        self.read().summaries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn sessions(&self, user_id: Uuid, range: &DateRange) -> Vec<SessionSummary> {
        let mut sessions: Vec<SessionSummary> = self
            .read()
            .summaries
            .get(&user_id)
            .map(|all| all.iter().filter(|s| range.contains(s.date())).cloned().collect())
            .unwrap_or_default();
        sessions.sort_by_key(|s| s.start);
        sessions
    }

    fn power_series(&self, session_id: Uuid) -> Option<Vec<Option<f64>>> {
        self.read().series.get(&session_id).cloned()
    }
}
