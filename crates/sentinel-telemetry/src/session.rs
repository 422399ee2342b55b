//! Session-level trading statistics.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::metrics;

/// Point-in-time view of session stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub started_at: DateTime<Utc>,
    pub starting_equity: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
}

impl SessionSnapshot {
    pub fn win_rate(&self) -> Option<f64> {
        let settled = self.wins + self.losses;
        if settled == 0 {
            return None;
        }
        Some(f64::from(self.wins) / f64::from(settled))
    }
}

/// Accumulated results since the loop started.
///
/// Starting equity is captured on the first usable account snapshot
/// and anchors the session-drawdown calculation.
pub struct SessionStats {
    started_at: DateTime<Utc>,
    starting_equity: Mutex<Option<Decimal>>,
    realized_pnl: Mutex<Decimal>,
    trades: AtomicU32,
    wins: AtomicU32,
    losses: AtomicU32,
}

impl SessionStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            starting_equity: Mutex::new(None),
            realized_pnl: Mutex::new(Decimal::ZERO),
            trades: AtomicU32::new(0),
            wins: AtomicU32::new(0),
            losses: AtomicU32::new(0),
        }
    }

    /// Capture starting equity once; later calls are ignored.
    pub fn anchor_equity(&self, equity: Decimal) {
        let mut anchor = self.starting_equity.lock();
        if anchor.is_none() {
            *anchor = Some(equity);
        }
    }

    pub fn record_entry(&self) {
        self.trades.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold a realized trade result into the session total.
    pub fn record_realized(&self, pnl: Decimal) {
        let mut total = self.realized_pnl.lock();
        *total += pnl;
        metrics::SESSION_PNL.set(total.to_f64().unwrap_or(0.0));
        drop(total);

        if pnl >= Decimal::ZERO {
            self.wins.fetch_add(1, Ordering::Relaxed);
        } else {
            self.losses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Realized session P&L over starting equity, negative when under
    /// water.
    ///
    /// None until the equity anchor is set.
    pub fn drawdown_fraction(&self) -> Option<Decimal> {
        self.drawdown_fraction_with(Decimal::ZERO)
    }

    /// Session drawdown with open-position unrealized P&L folded in.
    ///
    /// Stats only track settled trades, so the caller supplies the
    /// unrealized total from the live position view.
    pub fn drawdown_fraction_with(&self, unrealized: Decimal) -> Option<Decimal> {
        let anchor = (*self.starting_equity.lock())?;
        if anchor <= Decimal::ZERO {
            return None;
        }
        Some((*self.realized_pnl.lock() + unrealized) / anchor)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            started_at: self.started_at,
            starting_equity: *self.starting_equity.lock(),
            realized_pnl: *self.realized_pnl.lock(),
            trades: self.trades.load(Ordering::Relaxed),
            wins: self.wins.load(Ordering::Relaxed),
            losses: self.losses.load(Ordering::Relaxed),
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
