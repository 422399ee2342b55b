//! Main trading engine orchestration.
//!
//! Drives the per-interval decision cycle:
//! fetch market data, account, and regime concurrently; manage any
//! existing position first; compose a signal; size; run the guardrail
//! gate and the optional external risk validator; execute; record.
//! Any stage may short-circuit the cycle back to idle with a logged
//! decision. No stage error escapes the loop.
//!
//! A session drawdown past the configured limit closes everything and
//! stops the loop unconditionally; that requires an external restart,
//! unlike the gate's 24-hour block.

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sentinel_core::{AccountSnapshot, BarWindow, Price, Signal};
use sentinel_exec::{OrderExecutor, PositionSizer};
use sentinel_gate::SafetyGate;
use sentinel_persistence::{TradeEntryRecord, TradeLog};
use sentinel_position::{spawn_tick_consumer, PositionSupervisor};
use sentinel_providers::{
    AdvisoryProvider, AdvisoryReport, BrokerConnector, MarketDataProvider, PaperBroker,
    RegimeClassifier, RiskValidator, SyntheticMarketData, TradeIntent,
};
use sentinel_signal::SignalComposer;
use sentinel_telemetry::{metrics, DecisionCategory, DecisionLog, SessionStats};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, EngineMode};
use crate::error::{AppError, AppResult};
use crate::status::StatusSnapshot;
use crate::watchdog::Watchdog;

/// Where the cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Analyzing,
    Sizing,
    Gating,
    Executing,
    Managing,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Analyzing => "analyzing",
            Self::Sizing => "sizing",
            Self::Gating => "gating",
            Self::Executing => "executing",
            Self::Managing => "managing",
        };
        write!(f, "{s}")
    }
}

/// External collaborators the engine runs against.
pub struct Providers {
    pub broker: Arc<dyn BrokerConnector>,
    pub market_data: Arc<dyn MarketDataProvider>,
    pub advisory: Option<Arc<dyn AdvisoryProvider>>,
    pub regime: Option<Arc<dyn RegimeClassifier>>,
    pub risk_validator: Option<Arc<dyn RiskValidator>>,
}

/// The trading loop and everything it owns.
pub struct TradingEngine {
    config: EngineConfig,
    broker: Arc<dyn BrokerConnector>,
    market_data: Arc<dyn MarketDataProvider>,
    advisory: Option<Arc<dyn AdvisoryProvider>>,
    regime: Option<Arc<dyn RegimeClassifier>>,
    risk_validator: Option<Arc<dyn RiskValidator>>,
    gate: Arc<SafetyGate>,
    composer: SignalComposer,
    sizer: PositionSizer,
    executor: Arc<OrderExecutor>,
    supervisor: Arc<PositionSupervisor>,
    stats: Arc<SessionStats>,
    decisions: Arc<DecisionLog>,
    trade_log: Option<Arc<TradeLog>>,
    running: Arc<AtomicBool>,
    last_cycle: Arc<Mutex<Instant>>,
    state: Mutex<CycleState>,
    last_signal: Mutex<Option<Signal>>,
}

impl TradingEngine {
    /// Wire an engine from explicit providers.
    pub fn new(config: EngineConfig, providers: Providers) -> AppResult<Self> {
        config.validate()?;

        let gate = Arc::new(SafetyGate::new(config.gate.clone()));
        let composer = SignalComposer::new(config.signal.clone());
        let sizer = PositionSizer::new(config.sizer.clone());
        let executor = Arc::new(OrderExecutor::new(config.exec.clone()));
        let stats = Arc::new(SessionStats::new());
        let trade_log = config
            .persistence
            .enabled
            .then(|| Arc::new(TradeLog::new(&config.persistence.data_dir)));
        let supervisor = Arc::new(PositionSupervisor::new(
            config.position.clone(),
            providers.broker.clone(),
            executor.clone(),
            gate.clone(),
            stats.clone(),
            trade_log.clone(),
        ));
        let decisions = Arc::new(DecisionLog::new(config.decision_capacity));

        Ok(Self {
            broker: providers.broker,
            market_data: providers.market_data,
            advisory: providers.advisory,
            regime: providers.regime,
            risk_validator: providers.risk_validator,
            gate,
            composer,
            sizer,
            executor,
            supervisor,
            stats,
            decisions,
            trade_log,
            running: Arc::new(AtomicBool::new(false)),
            last_cycle: Arc::new(Mutex::new(Instant::now())),
            state: Mutex::new(CycleState::Idle),
            last_signal: Mutex::new(None),
            config,
        })
    }

    /// Paper engine: in-memory broker, synthetic market data, no
    /// advisory or external risk validator.
    pub fn paper(config: EngineConfig) -> AppResult<Self> {
        if config.mode != EngineMode::Paper {
            return Err(AppError::Config(
                "live mode requires a broker connector adapter; none is configured".into(),
            ));
        }
        let broker = Arc::new(PaperBroker::new(config.paper.clone()));
        let market_data = Arc::new(SyntheticMarketData::new(
            Decimal::from(100),
            10,
            Utc::now().timestamp_millis() as u64,
        ));
        Self::new(
            config,
            Providers {
                broker,
                market_data,
                advisory: None,
                regime: None,
                risk_validator: None,
            },
        )
    }

    fn set_state(&self, state: CycleState) {
        *self.state.lock() = state;
    }

    /// Ask the loop to stop after the in-flight cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run the loop until stopped or session-fatal.
    pub async fn run(&self) -> AppResult<()> {
        self.running.store(true, Ordering::SeqCst);
        *self.last_cycle.lock() = Instant::now();

        match self.broker.subscribe_ticks(&self.config.symbols).await {
            Ok(Some(ticks)) => {
                info!("Tick stream available, spawning consumer");
                spawn_tick_consumer(self.supervisor.clone(), ticks);
            }
            Ok(None) => info!("No tick stream, relying on cycle-driven management"),
            Err(e) => warn!(error = %e, "Tick subscription failed, continuing without"),
        }

        let cycle_interval = Duration::from_secs(self.config.cycle_interval_secs);
        let (nudge_tx, mut nudge_rx) = mpsc::channel(1);
        let watchdog = Watchdog::new(
            cycle_interval,
            self.last_cycle.clone(),
            self.running.clone(),
            nudge_tx,
        )
        .spawn();

        let mut ticker = tokio::time::interval(cycle_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            symbols = ?self.config.symbols,
            interval_secs = self.config.cycle_interval_secs,
            "Trading loop started"
        );

        while self.is_running() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = nudge_rx.recv() => {
                    debug!("Cycle triggered by watchdog nudge");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    self.stop();
                    break;
                }
            }
            if !self.is_running() {
                break;
            }

            self.run_cycle().await;
            *self.last_cycle.lock() = Instant::now();

            if self.check_session_drawdown().await {
                break;
            }
        }

        watchdog.abort();
        info!("Trading loop stopped");
        Ok(())
    }

    /// One full pass over every configured symbol. Never errors out;
    /// per-symbol failures are logged and recorded.
    pub async fn run_cycle(&self) {
        for symbol in &self.config.symbols {
            if let Err(e) = self.run_symbol_cycle(symbol).await {
                error!(symbol = %symbol, error = %e, "Cycle failed for symbol");
                self.decisions.record(
                    DecisionCategory::Cycle,
                    "error",
                    e.to_string(),
                    Some(symbol),
                    None,
                );
            }
        }
        metrics::CYCLES_TOTAL.inc();
        self.set_state(CycleState::Idle);
    }

    async fn run_symbol_cycle(&self, symbol: &str) -> AppResult<()> {
        self.set_state(CycleState::Fetching);
        let data_timeout = Duration::from_secs(self.config.data_timeout_secs);

        let bars_fut = timeout(
            data_timeout,
            self.market_data
                .get_bars(symbol, self.config.timeframe, self.config.bar_count),
        );
        let account_fut = timeout(data_timeout, self.broker.get_account());
        let regime_fut = self.fetch_regime(symbol);
        let (bars, account, regime) = tokio::join!(bars_fut, account_fut, regime_fut);

        let bars: BarWindow = match bars {
            Ok(Ok(b)) => b,
            Ok(Err(e)) => return self.skip(symbol, "data_quality", format!("market data error: {e}")),
            Err(_) => return self.skip(symbol, "data_quality", "market data timed out".to_string()),
        };
        let account: Option<AccountSnapshot> = match account {
            Ok(Ok(a)) => {
                self.stats.anchor_equity(a.equity.inner());
                Some(a)
            }
            _ => None,
        };

        let price = match self.current_price(symbol, &bars).await {
            Some(p) => p,
            None => return self.skip(symbol, "data_quality", "no usable price".to_string()),
        };

        // Existing position is always managed before any fresh
        // analysis; an open position also means no new entry this
        // cycle, so a second same-direction signal can never stack.
        // The symbol's management lock is held from this check through
        // order submission, so a tick-driven close cannot interleave
        // with a fresh entry.
        self.set_state(CycleState::Managing);
        let entry_guard = self.supervisor.entry_lock(symbol).await;
        if self.supervisor.open_position(symbol).await?.is_some() {
            drop(entry_guard);
            let outcome = self.supervisor.manage(symbol, price).await?;
            if outcome.closed {
                self.decisions.record(
                    DecisionCategory::Position,
                    "close",
                    outcome.reason.clone().unwrap_or_default(),
                    Some(symbol),
                    outcome
                        .realized_pnl
                        .map(|p| serde_json::json!({ "pnl": p.to_string() })),
                );
                metrics::CYCLE_SKIPS.with_label_values(&["managed_close"]).inc();
            } else {
                debug!(symbol = %symbol, "Position open, no fresh entry this cycle");
                metrics::CYCLE_SKIPS.with_label_values(&["position_open"]).inc();
            }
            return Ok(());
        }

        self.set_state(CycleState::Analyzing);
        let quality = bars.quality(
            self.config.min_bars,
            chrono::Duration::seconds(self.config.max_bar_age_secs),
        );
        if !quality.is_ok() {
            return self.skip(symbol, "data_quality", quality.reason());
        }

        let advisory = self.fetch_advisory(symbol).await;
        let signal = self
            .composer
            .compose(symbol, advisory.as_ref(), &bars, regime);
        *self.last_signal.lock() = Some(signal.clone());

        let Some(side) = signal.action.side() else {
            self.decisions.record(
                DecisionCategory::Signal,
                "hold",
                signal.reason.clone(),
                Some(symbol),
                None,
            );
            metrics::CYCLE_SKIPS.with_label_values(&["hold"]).inc();
            return Ok(());
        };

        // Sizing precedes the gate: the notional checks need a sized
        // quantity.
        self.set_state(CycleState::Sizing);
        let sizing = self.sizer.size(price, regime, account.as_ref());
        if !sizing.is_tradable() {
            return self.skip(symbol, "sizing", "sizing produced zero quantity".to_string());
        }
        let notional = sizing.qty.notional(price);

        self.set_state(CycleState::Gating);
        let Some(account) = account else {
            return self.skip(symbol, "data_quality", "account snapshot unavailable".to_string());
        };
        let verdict = self
            .gate
            .validate(symbol, notional, signal.confidence, &account);
        if !verdict.allowed {
            let failing = verdict
                .checks
                .iter()
                .find(|c| !c.passed)
                .map(|c| c.name)
                .unwrap_or("unknown");
            metrics::GATE_BLOCKS.with_label_values(&[failing]).inc();
            metrics::CYCLE_SKIPS.with_label_values(&["gate"]).inc();
            self.decisions.record(
                DecisionCategory::Gate,
                "reject",
                verdict.reason.clone(),
                Some(symbol),
                serde_json::to_value(&verdict.checks).ok(),
            );
            return Ok(());
        }

        if !self
            .consult_risk_validator(symbol, side, sizing.qty, price, notional, &signal)
            .await
        {
            return Ok(());
        }

        self.set_state(CycleState::Executing);
        metrics::ORDERS_SUBMITTED.inc();
        let result = match self
            .executor
            .execute(self.broker.as_ref(), symbol, side, sizing.qty, price, true)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                metrics::ORDERS_REJECTED.inc();
                self.decisions.record(
                    DecisionCategory::Execution,
                    "failed",
                    e.to_string(),
                    Some(symbol),
                    None,
                );
                return Ok(());
            }
        };
        self.supervisor.invalidate_cache();
        self.stats.record_entry();

        if result.used_fallback {
            metrics::BRACKET_FALLBACKS.inc();
        }
        if result.order.is_filled() {
            metrics::ORDERS_FILLED.inc();
        }
        if let Some(slip) = result.slippage {
            metrics::SLIPPAGE.observe(slip.to_f64().unwrap_or(0.0));
        }

        if let Some(log) = &self.trade_log {
            log.log_entry(TradeEntryRecord {
                timestamp: Utc::now(),
                order_id: result.order.id.clone(),
                symbol: symbol.to_string(),
                side: side.to_string(),
                qty: sizing.qty.inner(),
                expected_price: price.inner(),
                filled_price: result.order.filled_avg_price.map(|p| p.inner()),
                slippage_pct: result.slippage.map(|s| s * Decimal::from(100)),
                confidence: signal.confidence,
                regime: signal.regime.map(|r| r.to_string()),
                strategy_tag: "composite".to_string(),
            });
        }

        self.decisions.record(
            DecisionCategory::Execution,
            "entry",
            format!("{side} {} @ ~{price}", sizing.qty),
            Some(symbol),
            Some(serde_json::json!({
                "order_id": result.order.id,
                "status": result.order.status.to_string(),
                "timed_out": result.timed_out,
                "used_fallback": result.used_fallback,
            })),
        );

        // A just-opened position is immediately supervised; normally a
        // no-op, but a fast adverse move gets caught this cycle. The
        // entry lock must be released first: manage takes it itself.
        self.set_state(CycleState::Managing);
        drop(entry_guard);
        let _ = self.supervisor.manage(symbol, price).await?;
        Ok(())
    }

    /// Record a skipped cycle with its reason.
    fn skip(&self, symbol: &str, label: &str, reason: String) -> AppResult<()> {
        debug!(symbol = %symbol, reason = %reason, "Cycle skipped");
        metrics::CYCLE_SKIPS.with_label_values(&[label]).inc();
        self.decisions
            .record(DecisionCategory::Cycle, "skip", reason, Some(symbol), None);
        Ok(())
    }

    /// Best price for this cycle: live quote if the provider answers
    /// quickly, else the latest close.
    async fn current_price(&self, symbol: &str, bars: &BarWindow) -> Option<Price> {
        let quote = timeout(
            Duration::from_secs(self.config.data_timeout_secs),
            self.market_data.latest_price(symbol),
        )
        .await;
        match quote {
            Ok(Ok(p)) if p.is_positive() => Some(p),
            _ => bars.last_close(),
        }
    }

    /// Advisory report with a hard timeout; absence degrades the
    /// composer to technical-only.
    async fn fetch_advisory(&self, symbol: &str) -> Option<AdvisoryReport> {
        let provider = self.advisory.as_ref()?;
        let deadline = Duration::from_secs(self.config.advisory_timeout_secs);
        match timeout(deadline, provider.analyze(symbol)).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                warn!(symbol = %symbol, error = %e, "Advisory failed, degrading to technical-only");
                None
            }
            Err(_) => {
                warn!(
                    symbol = %symbol,
                    timeout_secs = self.config.advisory_timeout_secs,
                    "Advisory timed out, degrading to technical-only"
                );
                None
            }
        }
    }

    /// Regime with a short timeout and a None default.
    async fn fetch_regime(&self, symbol: &str) -> Option<sentinel_core::Regime> {
        let classifier = self.regime.as_ref()?;
        let deadline = Duration::from_secs(self.config.regime_timeout_secs);
        match timeout(deadline, classifier.get_regime(symbol)).await {
            Ok(Ok(regime)) => regime,
            _ => None,
        }
    }

    /// Independent risk review. Fail-closed: unavailable means no
    /// trade. Returns whether the trade may proceed.
    async fn consult_risk_validator(
        &self,
        symbol: &str,
        side: sentinel_core::OrderSide,
        qty: sentinel_core::Qty,
        price: Price,
        notional: Decimal,
        signal: &Signal,
    ) -> bool {
        let Some(validator) = &self.risk_validator else {
            return true;
        };
        let intent = TradeIntent {
            symbol: symbol.to_string(),
            side,
            qty,
            price,
            notional,
            confidence: signal.confidence,
        };
        let deadline = Duration::from_secs(self.config.data_timeout_secs);
        let verdict = match timeout(deadline, validator.validate_trade(&intent)).await {
            Ok(Ok(v)) => v,
            _ => {
                warn!(symbol = %symbol, "Risk validator unavailable, failing closed");
                metrics::CYCLE_SKIPS.with_label_values(&["risk_validator"]).inc();
                self.decisions.record(
                    DecisionCategory::Gate,
                    "reject",
                    "risk validator unavailable".to_string(),
                    Some(symbol),
                    None,
                );
                return false;
            }
        };

        if verdict.approved && !verdict.demands_halt() {
            return true;
        }

        metrics::CYCLE_SKIPS.with_label_values(&["risk_validator"]).inc();
        self.decisions.record(
            DecisionCategory::Gate,
            "reject",
            format!("risk validator blocked: {}", verdict.blocking_rules()),
            Some(symbol),
            serde_json::to_value(&verdict.violations).ok(),
        );
        if verdict.demands_halt() {
            warn!(symbol = %symbol, "Risk validator demanded a halt, stopping loop");
            self.stop();
        }
        false
    }

    /// Session drawdown with open-position unrealized P&L folded in,
    /// negative when under water. None until the equity anchor is set.
    pub async fn session_drawdown(&self) -> Option<Decimal> {
        let unrealized: Decimal = match self.supervisor.open_positions().await {
            Ok(positions) => positions.iter().map(|p| p.unrealized_pnl()).sum(),
            Err(e) => {
                warn!(error = %e, "Positions unavailable, drawdown covers realized only");
                Decimal::ZERO
            }
        };
        self.stats.drawdown_fraction_with(unrealized)
    }

    /// Stop everything if the session is under water past the limit.
    ///
    /// Unrealized losses count: a position deep under water but still
    /// inside its own stop burns session budget all the same.
    async fn check_session_drawdown(&self) -> bool {
        let Some(drawdown) = self.session_drawdown().await else {
            return false;
        };
        if drawdown > -self.config.max_session_drawdown {
            return false;
        }

        warn!(
            drawdown = %drawdown,
            limit = %self.config.max_session_drawdown,
            "Session drawdown limit breached, stopping unconditionally"
        );
        self.decisions.record(
            DecisionCategory::Session,
            "stop",
            format!(
                "session drawdown {drawdown} breached limit {}",
                self.config.max_session_drawdown
            ),
            None,
            None,
        );

        match self.supervisor.close_all("emergency").await {
            Ok(report) => {
                info!(
                    closed = report.closed.len(),
                    failed = report.failed.len(),
                    "Emergency close complete"
                );
                for (symbol, err) in &report.failed {
                    error!(symbol = %symbol, error = %err, "Emergency close failed for symbol");
                }
            }
            Err(e) => error!(error = %e, "Emergency close could not list positions"),
        }

        self.stop();
        true
    }

    /// Read-only status snapshot with defensive copies.
    pub async fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            running: self.is_running(),
            state: self.state.lock().to_string(),
            config: self.config.clone(),
            session: self.stats.snapshot(),
            guardrails: self.gate.state_snapshot(),
            open_positions: self.supervisor.open_positions().await.unwrap_or_default(),
            last_signal: self.last_signal.lock().clone(),
            recent_decisions: self.decisions.snapshot(),
        }
    }

    /// Decision audit snapshot, oldest first.
    pub fn decisions(&self) -> Vec<sentinel_telemetry::Decision> {
        self.decisions.snapshot()
    }

    /// Session statistics handle (shared with the supervisor).
    pub fn session_stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }
}
