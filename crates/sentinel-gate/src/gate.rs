//! The safety gate: ordered guardrail evaluation over shared daily
//! state.
//!
//! Every order intent passes through [`SafetyGate::validate`] before
//! execution. Checks run in a fixed order and short-circuit on the
//! first failure; the successful path commits the trade timestamp and
//! daily count under the same lock as the checks, so two concurrent
//! intents can never both clear the cooldown before either commits.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use sentinel_core::AccountSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::checks::{GateVerdict, GuardrailCheck};
use crate::hours::is_market_open;

// ============================================================================
// Configuration
// ============================================================================

/// Guardrail limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum composite confidence to trade.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Maximum notional value of a single trade.
    #[serde(default = "default_max_trade_value")]
    pub max_trade_value: Decimal,

    /// Daily realized-loss limit. Losses beyond 1.5x this trip the
    /// 24-hour emergency block.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,

    /// Maximum validated trades per day.
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u32,

    /// Minimum seconds between validated trades.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Maximum order notional as a fraction of portfolio value.
    #[serde(default = "default_max_position_fraction")]
    pub max_position_fraction: Decimal,

    /// Skip the market-hours check (24/7 assets).
    #[serde(default)]
    pub market_always_open: bool,
}

fn default_min_confidence() -> f64 {
    0.60
}

fn default_max_trade_value() -> Decimal {
    Decimal::from(10_000)
}

fn default_max_daily_loss() -> Decimal {
    Decimal::from(500)
}

fn default_max_daily_trades() -> u32 {
    10
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_max_position_fraction() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_trade_value: default_max_trade_value(),
            max_daily_loss: default_max_daily_loss(),
            max_daily_trades: default_max_daily_trades(),
            cooldown_secs: default_cooldown_secs(),
            max_position_fraction: default_max_position_fraction(),
            market_always_open: false,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Daily counters plus the emergency block, reset at local midnight.
///
/// `daily_loss` and `daily_trade_count` only increase until the reset;
/// `emergency_blocked_until` only moves forward and survives the
/// reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailState {
    pub daily_loss: Decimal,
    pub daily_trade_count: u32,
    pub last_trade_at: Option<DateTime<Utc>>,
    pub emergency_blocked_until: Option<DateTime<Utc>>,
    /// Local calendar day the counters belong to.
    stats_day: NaiveDate,
}

impl GuardrailState {
    fn new(today: NaiveDate) -> Self {
        Self {
            daily_loss: Decimal::ZERO,
            daily_trade_count: 0,
            last_trade_at: None,
            emergency_blocked_until: None,
            stats_day: today,
        }
    }

    /// Lazy daily reset. Counters zero out on the first touch after
    /// local midnight; the emergency block is untouched.
    fn roll_day(&mut self, today: NaiveDate) {
        if today != self.stats_day {
            info!(
                previous_day = %self.stats_day,
                trades = self.daily_trade_count,
                loss = %self.daily_loss,
                "Daily guardrail counters reset"
            );
            self.daily_loss = Decimal::ZERO;
            self.daily_trade_count = 0;
            self.last_trade_at = None;
            self.stats_day = today;
        }
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Pre-trade guardrail evaluator.
pub struct SafetyGate {
    config: GateConfig,
    state: Mutex<GuardrailState>,
}

impl SafetyGate {
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        let today = Local::now().date_naive();
        Self {
            config,
            state: Mutex::new(GuardrailState::new(today)),
        }
    }

    /// Validate an order intent against all guardrails.
    ///
    /// On success the trade timestamp and daily count are committed
    /// before the lock is released. Rejections mutate nothing.
    pub fn validate(
        &self,
        symbol: &str,
        notional: Decimal,
        confidence: f64,
        account: &AccountSnapshot,
    ) -> GateVerdict {
        self.validate_at(symbol, notional, confidence, account, Utc::now(), Local::now().date_naive())
    }

    fn validate_at(
        &self,
        symbol: &str,
        notional: Decimal,
        confidence: f64,
        account: &AccountSnapshot,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> GateVerdict {
        let mut state = self.state.lock();
        state.roll_day(today);

        let mut checks = Vec::with_capacity(8);

        // 1. Emergency block
        if let Some(until) = state.emergency_blocked_until {
            if now < until {
                let remaining_min = (until - now).num_minutes();
                checks.push(GuardrailCheck::fail(
                    "emergency_block",
                    format!("emergency block active for {remaining_min} more minutes"),
                    format!("blocked until {until}"),
                    "not blocked",
                ));
                return self.reject(symbol, checks);
            }
        }
        checks.push(GuardrailCheck::pass("emergency_block", "clear", "not blocked"));

        // 2. Confidence
        if confidence < self.config.min_confidence {
            checks.push(GuardrailCheck::fail(
                "confidence",
                format!(
                    "confidence {confidence:.2} below minimum {:.2}",
                    self.config.min_confidence
                ),
                format!("{confidence:.2}"),
                format!("{:.2}", self.config.min_confidence),
            ));
            return self.reject(symbol, checks);
        }
        checks.push(GuardrailCheck::pass(
            "confidence",
            format!("{confidence:.2}"),
            format!("{:.2}", self.config.min_confidence),
        ));

        // 3. Trade value
        if notional > self.config.max_trade_value {
            checks.push(GuardrailCheck::fail(
                "trade_value",
                format!(
                    "order value {notional} exceeds maximum {}",
                    self.config.max_trade_value
                ),
                notional,
                self.config.max_trade_value,
            ));
            return self.reject(symbol, checks);
        }
        checks.push(GuardrailCheck::pass("trade_value", notional, self.config.max_trade_value));

        // 4. Daily loss
        if state.daily_loss >= self.config.max_daily_loss {
            checks.push(GuardrailCheck::fail(
                "daily_loss",
                format!(
                    "daily loss {} reached limit {}",
                    state.daily_loss, self.config.max_daily_loss
                ),
                state.daily_loss,
                self.config.max_daily_loss,
            ));
            return self.reject(symbol, checks);
        }
        checks.push(GuardrailCheck::pass("daily_loss", state.daily_loss, self.config.max_daily_loss));

        // 5. Daily trade count
        if state.daily_trade_count >= self.config.max_daily_trades {
            checks.push(GuardrailCheck::fail(
                "daily_trades",
                format!(
                    "daily trade count {} reached limit {}",
                    state.daily_trade_count, self.config.max_daily_trades
                ),
                state.daily_trade_count,
                self.config.max_daily_trades,
            ));
            return self.reject(symbol, checks);
        }
        checks.push(GuardrailCheck::pass(
            "daily_trades",
            state.daily_trade_count,
            self.config.max_daily_trades,
        ));

        // 6. Cooldown
        let cooldown = Duration::seconds(self.config.cooldown_secs as i64);
        if let Some(last) = state.last_trade_at {
            let elapsed = now - last;
            if elapsed < cooldown {
                checks.push(GuardrailCheck::fail(
                    "cooldown",
                    format!(
                        "cooldown: {}s since last trade, {}s required",
                        elapsed.num_seconds(),
                        cooldown.num_seconds()
                    ),
                    format!("{}s", elapsed.num_seconds()),
                    format!("{}s", cooldown.num_seconds()),
                ));
                return self.reject(symbol, checks);
            }
        }
        checks.push(GuardrailCheck::pass(
            "cooldown",
            "elapsed",
            format!("{}s", cooldown.num_seconds()),
        ));

        // 7. Position fraction of portfolio
        let portfolio = account.portfolio_value.inner();
        let fraction_ok = portfolio > Decimal::ZERO
            && notional / portfolio <= self.config.max_position_fraction;
        if !fraction_ok {
            let observed = if portfolio > Decimal::ZERO {
                format!("{:.4}", notional / portfolio)
            } else {
                "n/a (zero portfolio value)".to_string()
            };
            checks.push(GuardrailCheck::fail(
                "position_fraction",
                format!(
                    "order is {observed} of portfolio, maximum {}",
                    self.config.max_position_fraction
                ),
                observed,
                self.config.max_position_fraction,
            ));
            return self.reject(symbol, checks);
        }
        checks.push(GuardrailCheck::pass(
            "position_fraction",
            format!("{:.4}", notional / portfolio),
            self.config.max_position_fraction,
        ));

        // 8. Market hours
        if !self.config.market_always_open && !is_market_open(now) {
            checks.push(GuardrailCheck::fail(
                "market_hours",
                "market closed",
                now.to_rfc3339(),
                "Mon-Fri 14:30-21:00 UTC",
            ));
            return self.reject(symbol, checks);
        }
        checks.push(GuardrailCheck::pass("market_hours", "open", "Mon-Fri 14:30-21:00 UTC"));

        // All clear: commit under the same lock as the checks.
        state.last_trade_at = Some(now);
        state.daily_trade_count += 1;

        info!(
            symbol = %symbol,
            notional = %notional,
            confidence = confidence,
            daily_trades = state.daily_trade_count,
            "Trade validated"
        );
        GateVerdict::allowed(checks)
    }

    fn reject(&self, symbol: &str, checks: Vec<GuardrailCheck>) -> GateVerdict {
        let verdict = GateVerdict::rejected(checks);
        info!(
            symbol = %symbol,
            reason = %verdict.reason,
            checks = verdict.checks.len(),
            "Trade rejected by guardrails"
        );
        verdict
    }

    /// Fold a realized loss into the daily accumulator.
    ///
    /// `amount` is the loss magnitude (positive). Crossing 1.5x the
    /// daily-loss limit trips a 24-hour emergency block; the block
    /// only ever extends forward and a repeat overflow never resets
    /// it.
    pub fn record_loss(&self, amount: Decimal) {
        self.record_loss_at(amount, Utc::now(), Local::now().date_naive());
    }

    fn record_loss_at(&self, amount: Decimal, now: DateTime<Utc>, today: NaiveDate) {
        if amount <= Decimal::ZERO {
            return;
        }
        let mut state = self.state.lock();
        state.roll_day(today);

        let trip_threshold = self.config.max_daily_loss * Decimal::new(15, 1);
        let before = state.daily_loss;
        state.daily_loss += amount;

        if before <= trip_threshold && state.daily_loss > trip_threshold {
            let until = now + Duration::hours(24);
            let extended = match state.emergency_blocked_until {
                Some(existing) if existing >= until => existing,
                _ => until,
            };
            state.emergency_blocked_until = Some(extended);
            warn!(
                daily_loss = %state.daily_loss,
                threshold = %trip_threshold,
                blocked_until = %extended,
                "EMERGENCY: daily loss overflow, trading blocked for 24h"
            );
        }
    }

    /// Current state for the status snapshot.
    pub fn state_snapshot(&self) -> GuardrailState {
        let mut state = self.state.lock();
        state.roll_day(Local::now().date_naive());
        state.clone()
    }
}
