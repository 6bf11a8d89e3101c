//! Thinking-level tariffs and cost tracking.
//!
//! Every reasoning pass is charged a fixed tariff by level. Conversations
//! report their own total on completion; a shared [`CostTracker`] keeps a
//! process-wide tally for the stats endpoint.
//!
//! All monetary values use [`rust_decimal::Decimal`] -- no floating-point
//! arithmetic.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use rendezvous_types::ThinkingLevel;
use rust_decimal::Decimal;
use serde::Serialize;

/// Fixed tariff for one reasoning pass at `level`.
///
/// | Level | Tariff |
/// |---|---|
/// | execution | 0 |
/// | tactical | 0.01 |
/// | strategic | 0.05 |
/// | meta_cognitive | 0.10 |
pub const fn level_cost(level: ThinkingLevel) -> Decimal {
    match level {
        ThinkingLevel::Execution => Decimal::ZERO,
        ThinkingLevel::Tactical => Decimal::from_parts(1, 0, 0, false, 2),
        ThinkingLevel::Strategic => Decimal::from_parts(5, 0, 0, false, 2),
        ThinkingLevel::MetaCognitive => Decimal::from_parts(10, 0, 0, false, 2),
    }
}

/// Thread-safe tally of reasoning passes per level.
///
/// Safe to share via `Arc<CostTracker>` across conversation tasks.
#[derive(Debug, Default)]
pub struct CostTracker {
    inner: Mutex<CostTrackerInner>,
}

#[derive(Debug, Default)]
struct CostTrackerInner {
    calls: BTreeMap<ThinkingLevel, u64>,
    total_cost: Decimal,
    conversations: u64,
}

/// Snapshot returned by [`CostTracker::summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CostSummary {
    /// Passes per level, keyed by level wire name.
    pub calls_by_level: BTreeMap<String, u64>,
    /// Total passes across levels.
    pub total_calls: u64,
    /// Total tariff charged.
    pub total_cost: Decimal,
    /// Conversations that reached a conclusion.
    pub completed_conversations: u64,
}

impl CostTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one reasoning pass at `level`.
    ///
    /// If the mutex is poisoned the update is skipped rather than
    /// panicking.
    pub fn record(&self, level: ThinkingLevel) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let count = inner.calls.entry(level).or_insert(0);
        *count = count.saturating_add(1);
        inner.total_cost = inner
            .total_cost
            .checked_add(level_cost(level))
            .unwrap_or(inner.total_cost);
    }

    /// Record that a conversation concluded.
    pub fn record_conversation(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.conversations = inner.conversations.saturating_add(1);
    }

    /// Snapshot of the current tally. Zeroed if the mutex is poisoned.
    pub fn summary(&self) -> CostSummary {
        let Ok(inner) = self.inner.lock() else {
            return CostSummary::default();
        };
        let calls_by_level = ThinkingLevel::ALL
            .iter()
            .map(|level| {
                (
                    level.as_str().to_owned(),
                    inner.calls.get(level).copied().unwrap_or(0),
                )
            })
            .collect();
        CostSummary {
            calls_by_level,
            total_calls: inner.calls.values().fold(0_u64, |acc, n| acc.saturating_add(*n)),
            total_cost: inner.total_cost,
            completed_conversations: inner.conversations,
        }
    }
}

impl fmt::Display for CostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Thinking cost: {} passes over {} conversations, total {}",
            self.total_calls, self.completed_conversations, self.total_cost
        )
    }
}
