//! In-process paper broker.
//!
//! Implements `BrokerConnector` against an in-memory ledger so the
//! whole engine can run end-to-end with no external broker. Fills are
//! immediate at the requested price plus a configurable synthetic
//! slippage, which keeps the executor's slippage accounting honest in
//! paper mode.

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use sentinel_core::{
    AccountSnapshot, Order, OrderRequest, OrderSide, OrderStatus, OrderType, Position, Price, Qty,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderResult};
use crate::tick::PriceTick;
use crate::traits::BrokerConnector;

/// Paper broker behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Starting cash balance.
    pub starting_balance: Decimal,
    /// Synthetic adverse slippage applied to every fill, in basis
    /// points of the requested price.
    pub slippage_bps: u32,
    /// Whether bracket legs are accepted. Turning this off exercises
    /// the executor's plain-order fallback.
    pub supports_bracket: bool,
    /// Completed trades retained in memory.
    pub max_trade_history: usize,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::from(100_000),
            slippage_bps: 2,
            supports_bracket: true,
            max_trade_history: 1_000,
        }
    }
}

/// One completed paper fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperTrade {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Qty,
    pub fill_price: Price,
    /// Realized P&L when this fill reduced or closed a position.
    pub realized_pnl: Option<Decimal>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug)]
struct Ledger {
    cash: Decimal,
    positions: HashMap<String, Position>,
    orders: HashMap<String, Order>,
    marks: HashMap<String, Price>,
    trades: VecDeque<PaperTrade>,
}

/// In-memory broker for paper trading and tests.
pub struct PaperBroker {
    config: PaperConfig,
    ledger: Mutex<Ledger>,
    tick_tx: Mutex<Option<mpsc::Sender<PriceTick>>>,
}

impl PaperBroker {
    #[must_use]
    pub fn new(config: PaperConfig) -> Self {
        let ledger = Ledger {
            cash: config.starting_balance,
            positions: HashMap::new(),
            orders: HashMap::new(),
            marks: HashMap::new(),
            trades: VecDeque::new(),
        };
        Self {
            config,
            ledger: Mutex::new(ledger),
            tick_tx: Mutex::new(None),
        }
    }

    /// Update the last known market price for a symbol.
    ///
    /// Marks drive equity valuation and market-order fills.
    pub fn set_mark(&self, symbol: &str, price: Price) {
        self.ledger.lock().marks.insert(symbol.to_string(), price);
    }

    /// Inject a streamed tick to any subscriber and update the mark.
    pub async fn push_tick(&self, tick: PriceTick) {
        self.set_mark(&tick.symbol, tick.price);
        let tx = self.tick_tx.lock().clone();
        if let Some(tx) = tx {
            // Receiver dropped means the consumer is gone; nothing to do.
            let _ = tx.send(tick).await;
        }
    }

    /// Completed trades, oldest first.
    pub fn trade_history(&self) -> Vec<PaperTrade> {
        self.ledger.lock().trades.iter().cloned().collect()
    }

    /// Adverse fill price: buys fill above the requested price, sells
    /// below.
    fn fill_price(&self, side: OrderSide, requested: Price) -> Price {
        let slip = Decimal::from(self.config.slippage_bps) / Decimal::from(10_000);
        match side {
            OrderSide::Buy => requested * (Decimal::ONE + slip),
            OrderSide::Sell => requested * (Decimal::ONE - slip),
        }
    }

    /// Apply a fill to the ledger. Returns realized P&L if the fill
    /// reduced or closed an existing position.
    fn apply_fill(
        ledger: &mut Ledger,
        symbol: &str,
        side: OrderSide,
        qty: Qty,
        price: Price,
    ) -> Option<Decimal> {
        let notional = qty.notional(price);
        match side {
            OrderSide::Buy => ledger.cash -= notional,
            OrderSide::Sell => ledger.cash += notional,
        }

        match ledger.positions.remove(symbol) {
            Some(mut pos) if pos.side == side => {
                // Same-direction add: average the entry.
                let total = pos.qty + qty;
                let blended =
                    (pos.qty.notional(pos.entry_price) + notional) / total.inner();
                pos.entry_price = Price::new(blended);
                pos.qty = total;
                pos.current_price = price;
                ledger.positions.insert(symbol.to_string(), pos);
                None
            }
            Some(mut pos) => {
                // Opposite side reduces, closes, or flips.
                let closing = if qty.inner() < pos.qty.inner() { qty } else { pos.qty };
                let per_unit = match pos.side {
                    OrderSide::Buy => price.inner() - pos.entry_price.inner(),
                    OrderSide::Sell => pos.entry_price.inner() - price.inner(),
                };
                let realized = per_unit * closing.inner();

                let remainder = qty - closing;
                if pos.qty == closing {
                    if remainder.is_positive() {
                        ledger.positions.insert(
                            symbol.to_string(),
                            Position::new(symbol, side, remainder, price, price),
                        );
                    }
                } else {
                    pos.qty = pos.qty - closing;
                    pos.current_price = price;
                    ledger.positions.insert(symbol.to_string(), pos);
                }
                Some(realized)
            }
            None => {
                ledger
                    .positions
                    .insert(symbol.to_string(), Position::new(symbol, side, qty, price, price));
                None
            }
        }
    }

    fn record_trade(&self, ledger: &mut Ledger, trade: PaperTrade) {
        ledger.trades.push_back(trade);
        while ledger.trades.len() > self.config.max_trade_history {
            ledger.trades.pop_front();
        }
    }
}

#[async_trait]
impl BrokerConnector for PaperBroker {
    async fn get_account(&self) -> ProviderResult<AccountSnapshot> {
        let ledger = self.ledger.lock();
        let mut market_value = Decimal::ZERO;
        for pos in ledger.positions.values() {
            let mark = ledger
                .marks
                .get(&pos.symbol)
                .copied()
                .unwrap_or(pos.current_price);
            let value = pos.qty.notional(mark);
            match pos.side {
                OrderSide::Buy => market_value += value,
                OrderSide::Sell => market_value -= value,
            }
        }
        let equity = ledger.cash + market_value;
        Ok(AccountSnapshot::new(
            Price::new(equity),
            Price::new(ledger.cash.max(Decimal::ZERO)),
            Price::new(ledger.cash),
            Price::new(equity),
        ))
    }

    async fn get_positions(&self) -> ProviderResult<Vec<Position>> {
        let ledger = self.ledger.lock();
        let mut positions: Vec<Position> = ledger
            .positions
            .values()
            .map(|p| {
                let mut p = p.clone();
                if let Some(mark) = ledger.marks.get(&p.symbol) {
                    p.current_price = *mark;
                }
                p
            })
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }

    async fn create_order(&self, request: OrderRequest) -> ProviderResult<Order> {
        if request.bracket.as_ref().is_some_and(|b| b.has_legs()) && !self.config.supports_bracket {
            return Err(ProviderError::BracketUnsupported(
                "paper broker configured without bracket support".to_string(),
            ));
        }
        if !request.qty.is_positive() {
            return Err(ProviderError::OrderRejected(format!(
                "non-positive quantity {}",
                request.qty
            )));
        }

        let mut ledger = self.ledger.lock();

        let reference = match request.order_type {
            OrderType::Limit => request
                .limit_price
                .ok_or_else(|| ProviderError::OrderRejected("limit order without price".into()))?,
            OrderType::Market => ledger
                .marks
                .get(&request.symbol)
                .copied()
                .ok_or_else(|| {
                    ProviderError::OrderRejected(format!("no mark for {}", request.symbol))
                })?,
        };

        let fill = self.fill_price(request.side, reference);
        let notional = request.qty.notional(fill);
        if request.side == OrderSide::Buy && notional > ledger.cash {
            return Err(ProviderError::InsufficientBuyingPower {
                needed: notional.to_string(),
                available: ledger.cash.to_string(),
            });
        }

        let realized =
            Self::apply_fill(&mut ledger, &request.symbol, request.side, request.qty, fill);
        ledger.marks.insert(request.symbol.clone(), fill);

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            client_id: request.client_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            qty: request.qty,
            filled_qty: request.qty,
            order_type: request.order_type,
            limit_price: request.limit_price,
            status: OrderStatus::Filled,
            filled_avg_price: Some(fill),
            submitted_at: now,
            updated_at: now,
        };
        ledger.orders.insert(order.id.clone(), order.clone());

        self.record_trade(
            &mut ledger,
            PaperTrade {
                order_id: order.id.clone(),
                symbol: request.symbol.clone(),
                side: request.side,
                qty: request.qty,
                fill_price: fill,
                realized_pnl: realized,
                timestamp: now,
            },
        );

        debug!(
            symbol = %request.symbol,
            side = %request.side,
            qty = %request.qty,
            fill = %fill,
            "Paper order filled"
        );

        Ok(order)
    }

    async fn get_order(&self, order_id: &str) -> ProviderResult<Order> {
        self.ledger
            .lock()
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| ProviderError::OrderNotFound(order_id.to_string()))
    }

    async fn cancel_order(&self, order_id: &str) -> ProviderResult<()> {
        let mut ledger = self.ledger.lock();
        match ledger.orders.get_mut(order_id) {
            // Paper fills are immediate, so cancels on terminal orders
            // are no-ops rather than errors.
            Some(_) => Ok(()),
            None => Err(ProviderError::OrderNotFound(order_id.to_string())),
        }
    }

    async fn subscribe_ticks(
        &self,
        _symbols: &[String],
    ) -> ProviderResult<Option<mpsc::Receiver<PriceTick>>> {
        let (tx, rx) = mpsc::channel(256);
        *self.tick_tx.lock() = Some(tx);
        Ok(Some(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sentinel_core::BracketSpec;

    fn broker() -> PaperBroker {
        PaperBroker::new(PaperConfig {
            slippage_bps: 0,
            ..PaperConfig::default()
        })
    }

    fn buy_req(qty: Decimal, limit: Decimal) -> OrderRequest {
        OrderRequest::limit("AAPL", OrderSide::Buy, Qty::new(qty), Price::new(limit))
    }

    #[tokio::test]
    async fn test_fill_opens_position() {
        let b = broker();
        let order = b.create_order(buy_req(dec!(10), dec!(100))).await.unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_avg_price, Some(Price::new(dec!(100))));

        let positions = b.get_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].qty, Qty::new(dec!(10)));

        let account = b.get_account().await.unwrap();
        // Cash down by 1000, position worth 1000: equity unchanged.
        assert_eq!(account.equity, Price::new(dec!(100000)));
        assert_eq!(account.cash, Price::new(dec!(99000)));
    }

    #[tokio::test]
    async fn test_synthetic_slippage_is_adverse() {
        let b = PaperBroker::new(PaperConfig {
            slippage_bps: 10,
            ..PaperConfig::default()
        });
        let order = b.create_order(buy_req(dec!(10), dec!(100))).await.unwrap();
        assert_eq!(order.filled_avg_price, Some(Price::new(dec!(100.10))));

        let sell =
            OrderRequest::limit("AAPL", OrderSide::Sell, Qty::new(dec!(10)), Price::new(dec!(100)));
        let order = b.create_order(sell).await.unwrap();
        assert_eq!(order.filled_avg_price, Some(Price::new(dec!(99.90))));
    }

    #[tokio::test]
    async fn test_round_trip_realizes_pnl() {
        let b = broker();
        b.create_order(buy_req(dec!(10), dec!(100))).await.unwrap();
        let sell =
            OrderRequest::limit("AAPL", OrderSide::Sell, Qty::new(dec!(10)), Price::new(dec!(105)));
        b.create_order(sell).await.unwrap();

        assert!(b.get_positions().await.unwrap().is_empty());
        let trades = b.trade_history();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].realized_pnl, Some(dec!(50)));

        let account = b.get_account().await.unwrap();
        assert_eq!(account.cash, Price::new(dec!(100050)));
    }

    #[tokio::test]
    async fn test_bracket_rejected_when_unsupported() {
        let b = PaperBroker::new(PaperConfig {
            supports_bracket: false,
            slippage_bps: 0,
            ..PaperConfig::default()
        });
        let req = buy_req(dec!(10), dec!(100)).with_bracket(BracketSpec::new(
            Some(Price::new(dec!(95))),
            Some(Price::new(dec!(110))),
        ));
        let err = b.create_order(req.clone()).await.unwrap_err();
        assert!(err.is_bracket_rejection());

        // Same entry without brackets succeeds.
        let order = b.create_order(req.without_bracket()).await.unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn test_insufficient_buying_power() {
        let b = PaperBroker::new(PaperConfig {
            starting_balance: dec!(500),
            slippage_bps: 0,
            ..PaperConfig::default()
        });
        let err = b.create_order(buy_req(dec!(10), dec!(100))).await.unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientBuyingPower { .. }));
    }

    #[tokio::test]
    async fn test_trade_history_bounded() {
        let b = PaperBroker::new(PaperConfig {
            slippage_bps: 0,
            max_trade_history: 5,
            ..PaperConfig::default()
        });
        for _ in 0..8 {
            b.create_order(buy_req(dec!(1), dec!(10))).await.unwrap();
        }
        assert_eq!(b.trade_history().len(), 5);
    }

    #[tokio::test]
    async fn test_tick_subscription_updates_mark() {
        let b = broker();
        let mut rx = b.subscribe_ticks(&["AAPL".to_string()]).await.unwrap().unwrap();
        b.push_tick(PriceTick::new("AAPL", Price::new(dec!(123)))).await;
        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.price, Price::new(dec!(123)));

        // Market orders fill at the mark.
        let order = b
            .create_order(OrderRequest::market("AAPL", OrderSide::Buy, Qty::new(dec!(1))))
            .await
            .unwrap();
        assert_eq!(order.filled_avg_price, Some(Price::new(dec!(123))));
    }
}
