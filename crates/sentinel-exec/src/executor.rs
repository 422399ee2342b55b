//! Order execution.
//!
//! Entries go out as marketable-limit orders (limit offset from the
//! current price by a small direction-aware tolerance) with attached
//! stop-loss/take-profit legs. Venues that reject brackets get the
//! same entry resubmitted as a plain limit order; the caller only sees
//! a logged warning. After submission the executor polls for a
//! terminal status up to a timeout and reports realized slippage.

use rust_decimal::Decimal;
use sentinel_core::{BracketSpec, Order, OrderRequest, OrderSide, Price, Qty};
use sentinel_providers::BrokerConnector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ExecError, ExecResult};

/// Execution tolerances and poll behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Marketable-limit offset from the current price (0.002 = 0.2%).
    #[serde(default = "default_limit_offset")]
    pub limit_offset: Decimal,

    /// Take-profit distance from entry, as a fraction.
    #[serde(default = "default_take_profit_fraction")]
    pub take_profit_fraction: Decimal,

    /// Stop-loss distance from entry, as a fraction.
    #[serde(default = "default_stop_loss_fraction")]
    pub stop_loss_fraction: Decimal,

    /// Fill-poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for a fill after this many seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Log a warning when realized slippage exceeds this fraction.
    #[serde(default = "default_slippage_warn")]
    pub slippage_warn: Decimal,
}

fn default_limit_offset() -> Decimal {
    Decimal::new(2, 3) // 0.002
}

fn default_take_profit_fraction() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_stop_loss_fraction() -> Decimal {
    Decimal::new(3, 2) // 0.03
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_slippage_warn() -> Decimal {
    Decimal::new(5, 3) // 0.005
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            limit_offset: default_limit_offset(),
            take_profit_fraction: default_take_profit_fraction(),
            stop_loss_fraction: default_stop_loss_fraction(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            slippage_warn: default_slippage_warn(),
        }
    }
}

/// Outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order: Order,
    /// Price the decision was made at.
    pub expected_price: Price,
    /// `|fill - expected| / expected`, once filled.
    pub slippage: Option<Decimal>,
    /// Fill confirmation did not arrive within the poll window; the
    /// order may still fill later.
    pub timed_out: bool,
    /// The bracket was rejected and the entry went out plain.
    pub used_fallback: bool,
}

/// Submits orders and confirms fills.
pub struct OrderExecutor {
    config: ExecConfig,
}

impl OrderExecutor {
    #[must_use]
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    /// Marketable limit price: slightly through the market in the
    /// direction of the order so it fills like a market order with a
    /// bounded worst case.
    fn limit_price(&self, side: OrderSide, current: Price) -> Price {
        match side {
            OrderSide::Buy => current * (Decimal::ONE + self.config.limit_offset),
            OrderSide::Sell => current * (Decimal::ONE - self.config.limit_offset),
        }
    }

    /// Protective legs around the expected entry.
    fn bracket(&self, side: OrderSide, current: Price) -> BracketSpec {
        let tp = self.config.take_profit_fraction;
        let sl = self.config.stop_loss_fraction;
        match side {
            OrderSide::Buy => BracketSpec::new(
                Some(current * (Decimal::ONE - sl)),
                Some(current * (Decimal::ONE + tp)),
            ),
            OrderSide::Sell => BracketSpec::new(
                Some(current * (Decimal::ONE + sl)),
                Some(current * (Decimal::ONE - tp)),
            ),
        }
    }

    /// Submit an entry order and wait for its fill.
    ///
    /// `protect` attaches bracket legs; closes pass `false`.
    pub async fn execute(
        &self,
        broker: &dyn BrokerConnector,
        symbol: &str,
        side: OrderSide,
        qty: Qty,
        current_price: Price,
        protect: bool,
    ) -> ExecResult<OrderResult> {
        let limit = self.limit_price(side, current_price);
        let mut request = OrderRequest::limit(symbol, side, qty, limit);
        if protect {
            request = request.with_bracket(self.bracket(side, current_price));
        }

        let (order, used_fallback) = self.submit_with_fallback(broker, request).await?;
        let (order, timed_out) = self.await_fill(broker, order).await?;

        let slippage = order
            .filled_avg_price
            .and_then(|fill| fill.abs_fraction_from(current_price));
        if let Some(slip) = slippage {
            if slip > self.config.slippage_warn {
                warn!(
                    symbol = %symbol,
                    slippage = %slip,
                    threshold = %self.config.slippage_warn,
                    expected = %current_price,
                    fill = %order.filled_avg_price.unwrap_or(Price::ZERO),
                    "Fill slippage above threshold"
                );
            }
        }

        info!(
            symbol = %symbol,
            side = %side,
            qty = %qty,
            status = %order.status,
            timed_out = timed_out,
            used_fallback = used_fallback,
            "Order execution complete"
        );

        Ok(OrderResult {
            order,
            expected_price: current_price,
            slippage,
            timed_out,
            used_fallback,
        })
    }

    /// Submit; on bracket rejection, retry the same entry plain.
    async fn submit_with_fallback(
        &self,
        broker: &dyn BrokerConnector,
        request: OrderRequest,
    ) -> ExecResult<(Order, bool)> {
        let had_bracket = request.bracket.as_ref().is_some_and(|b| b.has_legs());
        match broker.create_order(request.clone()).await {
            Ok(order) => Ok((order, false)),
            Err(err) if had_bracket && err.is_bracket_rejection() => {
                warn!(
                    symbol = %request.symbol,
                    error = %err,
                    "Bracket rejected, falling back to plain limit order"
                );
                let order = broker.create_order(request.without_bracket()).await?;
                Ok((order, true))
            }
            Err(err) => Err(ExecError::from(err)),
        }
    }

    /// Poll until the order is terminal or the window closes.
    ///
    /// A timeout is not a failure: the best-known order state comes
    /// back flagged, and the caller must not assume fill or no-fill.
    async fn await_fill(
        &self,
        broker: &dyn BrokerConnector,
        order: Order,
    ) -> ExecResult<(Order, bool)> {
        if order.is_terminal() {
            return Ok((order, false));
        }

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.poll_timeout_secs);
        let mut latest = order;
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
            latest = broker.get_order(&latest.id).await?;
            if latest.is_terminal() {
                debug!(order_id = %latest.id, status = %latest.status, "Order terminal");
                return Ok((latest, false));
            }
        }

        warn!(
            order_id = %latest.id,
            status = %latest.status,
            timeout_secs = self.config.poll_timeout_secs,
            "Fill confirmation timed out, order may still fill"
        );
        Ok((latest, true))
    }
}
