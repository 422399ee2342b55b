//! Decision audit log.
//!
//! Every skip, rejection, trade, and recovery lands here as a
//! [`Decision`] in a fixed-capacity ring. Inserts are O(1), the
//! oldest entries are silently overwritten, and recording never
//! blocks the trading loop on I/O.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_DECISION_CAPACITY: usize = 200;

/// What part of the engine produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCategory {
    Cycle,
    Signal,
    Gate,
    Execution,
    Position,
    Session,
    Watchdog,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub category: DecisionCategory,
    pub action: String,
    pub reason: String,
    pub symbol: Option<String>,
    /// Structured context (check lists, fill details).
    pub extra: Option<serde_json::Value>,
}

/// Fixed-capacity ring of recent decisions.
pub struct DecisionLog {
    capacity: usize,
    next_id: AtomicU64,
    ring: Mutex<VecDeque<Decision>>,
}

impl DecisionLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            ring: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Record a decision, overwriting the oldest entry when full.
    pub fn record(
        &self,
        category: DecisionCategory,
        action: impl Into<String>,
        reason: impl Into<String>,
        symbol: Option<&str>,
        extra: Option<serde_json::Value>,
    ) {
        let decision = Decision {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            category,
            action: action.into(),
            reason: reason.into(),
            symbol: symbol.map(str::to_string),
            extra,
        };
        let mut ring = self.ring.lock();
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(decision);
    }

    /// Defensive copy of recent decisions, oldest first.
    pub fn snapshot(&self) -> Vec<Decision> {
        self.ring.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new(DEFAULT_DECISION_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let log = DecisionLog::new(10);
        log.record(DecisionCategory::Gate, "reject", "cooldown", Some("AAPL"), None);
        let snap = log.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].id, 1);
        assert_eq!(snap[0].symbol.as_deref(), Some("AAPL"));
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let log = DecisionLog::new(3);
        for i in 0..5 {
            log.record(DecisionCategory::Cycle, "skip", format!("r{i}"), None, None);
        }
        let snap = log.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[0].reason, "r2");
        assert_eq!(snap[2].reason, "r4");
        // IDs keep increasing across overwrites.
        assert_eq!(snap[2].id, 5);
    }
}
