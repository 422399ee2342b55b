//! JSON Lines trade log.
//!
//! Uses JSON Lines format (.jsonl) for robustness:
//! - Each line is a complete JSON object
//! - Partial file corruption only affects individual lines
//! - Can be read even if write was interrupted
//!
//! Writes are fire-and-forget from the engine's point of view: the
//! [`TradeLog`] handle logs a warning on failure and never propagates
//! the error, so a full disk cannot abort a trade.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::PersistenceResult;

/// Trade entry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEntryRecord {
    pub timestamp: DateTime<Utc>,
    pub order_id: String,
    pub symbol: String,
    pub side: String,
    pub qty: Decimal,
    pub expected_price: Decimal,
    pub filled_price: Option<Decimal>,
    pub slippage_pct: Option<Decimal>,
    pub confidence: f64,
    pub regime: Option<String>,
    pub strategy_tag: String,
}

/// Trade exit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExitRecord {
    pub timestamp: DateTime<Utc>,
    pub order_id: String,
    pub symbol: String,
    pub qty: Decimal,
    pub exit_price: Decimal,
    pub pnl: Decimal,
    pub pnl_pct: Option<Decimal>,
    pub reason: String,
}

/// One line in the log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TradeRecord {
    Entry(TradeEntryRecord),
    Exit(TradeExitRecord),
}

struct ActiveWriter {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

struct Inner {
    base_dir: PathBuf,
    active: Option<ActiveWriter>,
}

impl Inner {
    /// Writer for today's file, rotating at the UTC date boundary.
    fn writer_for_today(&mut self) -> PersistenceResult<&mut ActiveWriter> {
        let date = Utc::now().format("%Y-%m-%d").to_string();

        let stale = self.active.as_ref().is_some_and(|a| a.date != date);
        if stale {
            if let Some(mut old) = self.active.take() {
                if let Err(e) = old.writer.flush() {
                    warn!(?e, "Failed to flush trade log on rotation");
                }
                info!(date = %old.date, records = old.records_written, "Closed trade log file");
            }
        }

        if self.active.is_none() {
            let filename = self.base_dir.join(format!("trades_{date}.jsonl"));
            info!(filename = %filename.display(), "Opening trade log (append mode)");
            // Append mode - never truncates existing data.
            let file = OpenOptions::new().create(true).append(true).open(&filename)?;
            self.active = Some(ActiveWriter {
                writer: BufWriter::new(file),
                date,
                records_written: 0,
            });
        }

        // Invariant: populated above.
        Ok(self.active.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "trade log writer missing")
        })?)
    }

    fn write(&mut self, record: &TradeRecord) -> PersistenceResult<()> {
        let active = self.writer_for_today()?;
        let line = serde_json::to_string(record)?;
        writeln!(active.writer, "{line}")?;
        // Trades are rare; flush each one so a crash loses nothing.
        active.writer.flush()?;
        active.records_written += 1;
        Ok(())
    }
}

/// Append-only trade log with daily file rotation.
pub struct TradeLog {
    inner: Mutex<Inner>,
}

impl TradeLog {
    /// Create a trade log rooted at `base_dir` (created if missing).
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        if let Err(e) = std::fs::create_dir_all(&base_dir) {
            warn!(?e, dir = %base_dir.display(), "Failed to create trade log directory");
        }
        Self {
            inner: Mutex::new(Inner {
                base_dir,
                active: None,
            }),
        }
    }

    /// Record a trade entry. Failures are logged, never returned.
    pub fn log_entry(&self, record: TradeEntryRecord) {
        if let Err(e) = self.inner.lock().write(&TradeRecord::Entry(record)) {
            warn!(?e, "Failed to write trade entry record");
        }
    }

    /// Record a trade exit. Failures are logged, never returned.
    pub fn log_exit(&self, record: TradeExitRecord) {
        if let Err(e) = self.inner.lock().write(&TradeRecord::Exit(record)) {
            warn!(?e, "Failed to write trade exit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry() -> TradeEntryRecord {
        TradeEntryRecord {
            timestamp: Utc::now(),
            order_id: "o-1".into(),
            symbol: "AAPL".into(),
            side: "buy".into(),
            qty: dec!(10),
            expected_price: dec!(100),
            filled_price: Some(dec!(100.2)),
            slippage_pct: Some(dec!(0.002)),
            confidence: 0.73,
            regime: Some("trending_bull".into()),
            strategy_tag: "composite".into(),
        }
    }

    #[test]
    fn test_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = TradeLog::new(dir.path());
        log.log_entry(entry());
        log.log_exit(TradeExitRecord {
            timestamp: Utc::now(),
            order_id: "o-2".into(),
            symbol: "AAPL".into(),
            qty: dec!(10),
            exit_price: dec!(105),
            pnl: dec!(48),
            pnl_pct: Some(dec!(0.048)),
            reason: "take_profit".into(),
        });

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let content =
            std::fs::read_to_string(dir.path().join(format!("trades_{date}.jsonl"))).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: TradeRecord = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(first, TradeRecord::Entry(_)));
        let second: TradeRecord = serde_json::from_str(lines[1]).unwrap();
        match second {
            TradeRecord::Exit(e) => assert_eq!(e.reason, "take_profit"),
            other => panic!("expected exit, got {other:?}"),
        }
    }

    #[test]
    fn test_append_mode_preserves_existing() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = TradeLog::new(dir.path());
            log.log_entry(entry());
        }
        {
            let log = TradeLog::new(dir.path());
            log.log_entry(entry());
        }
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let content =
            std::fs::read_to_string(dir.path().join(format!("trades_{date}.jsonl"))).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_unwritable_dir_does_not_panic() {
        let log = TradeLog::new("/proc/nonexistent/trades");
        log.log_entry(entry()); // warn only
    }
}
