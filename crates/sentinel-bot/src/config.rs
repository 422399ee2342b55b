//! Engine configuration.

use crate::error::{AppError, AppResult};
use rust_decimal::Decimal;
use sentinel_exec::{ExecConfig, SizerConfig};
use sentinel_gate::GateConfig;
use sentinel_position::PositionConfig;
use sentinel_providers::{PaperConfig, Timeframe};
use sentinel_signal::SignalConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Execution backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// In-memory paper broker and synthetic market data.
    #[default]
    Paper,
    /// Live broker connector (requires a connector adapter).
    Live,
}

/// Trade log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_persistence_enabled() -> bool {
    true
}

fn default_data_dir() -> String {
    "data/trades".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            data_dir: default_data_dir(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: EngineMode,

    /// Symbols the loop trades.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Decision cycle interval in seconds.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Bar timeframe for analysis.
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,

    /// Bars fetched per cycle.
    #[serde(default = "default_bar_count")]
    pub bar_count: usize,

    /// Minimum bars required for analysis.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    /// Maximum age of the newest bar in seconds.
    #[serde(default = "default_max_bar_age_secs")]
    pub max_bar_age_secs: i64,

    /// Advisory call timeout in seconds.
    #[serde(default = "default_advisory_timeout_secs")]
    pub advisory_timeout_secs: u64,

    /// Regime classifier timeout in seconds.
    #[serde(default = "default_regime_timeout_secs")]
    pub regime_timeout_secs: u64,

    /// Market data / account fetch timeout in seconds.
    #[serde(default = "default_data_timeout_secs")]
    pub data_timeout_secs: u64,

    /// Session P&L over starting equity at which the loop stops
    /// unconditionally (0.05 = stop at -5%).
    #[serde(default = "default_max_session_drawdown")]
    pub max_session_drawdown: Decimal,

    /// Decision audit ring capacity.
    #[serde(default = "default_decision_capacity")]
    pub decision_capacity: usize,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub signal: SignalConfig,

    #[serde(default)]
    pub sizer: SizerConfig,

    #[serde(default)]
    pub exec: ExecConfig,

    #[serde(default)]
    pub position: PositionConfig,

    #[serde(default)]
    pub paper: PaperConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

fn default_symbols() -> Vec<String> {
    vec!["AAPL".to_string()]
}

fn default_cycle_interval_secs() -> u64 {
    60
}

fn default_timeframe() -> Timeframe {
    Timeframe::Min5
}

fn default_bar_count() -> usize {
    50
}

fn default_min_bars() -> usize {
    20
}

fn default_max_bar_age_secs() -> i64 {
    900
}

fn default_advisory_timeout_secs() -> u64 {
    15
}

fn default_regime_timeout_secs() -> u64 {
    5
}

fn default_data_timeout_secs() -> u64 {
    10
}

fn default_max_session_drawdown() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_decision_capacity() -> usize {
    200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: EngineMode::Paper,
            symbols: default_symbols(),
            cycle_interval_secs: default_cycle_interval_secs(),
            timeframe: default_timeframe(),
            bar_count: default_bar_count(),
            min_bars: default_min_bars(),
            max_bar_age_secs: default_max_bar_age_secs(),
            advisory_timeout_secs: default_advisory_timeout_secs(),
            regime_timeout_secs: default_regime_timeout_secs(),
            data_timeout_secs: default_data_timeout_secs(),
            max_session_drawdown: default_max_session_drawdown(),
            decision_capacity: default_decision_capacity(),
            gate: GateConfig::default(),
            signal: SignalConfig::default(),
            sizer: SizerConfig::default(),
            exec: ExecConfig::default(),
            position: PositionConfig::default(),
            paper: PaperConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from `SENTINEL_CONFIG` or the default path.
    pub fn load() -> AppResult<Self> {
        let config_path = std::env::var("SENTINEL_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.symbols.is_empty() {
            return Err(AppError::Config("at least one symbol required".into()));
        }
        if self.cycle_interval_secs == 0 {
            return Err(AppError::Config("cycle_interval_secs must be positive".into()));
        }
        if self.min_bars == 0 || self.bar_count < self.min_bars {
            return Err(AppError::Config(
                "bar_count must be at least min_bars, both positive".into(),
            ));
        }
        if self.max_session_drawdown <= Decimal::ZERO {
            return Err(AppError::Config("max_session_drawdown must be positive".into()));
        }
        let weight_sum = self.signal.weight_advisory
            + self.signal.weight_risk
            + self.signal.weight_sentiment
            + self.signal.weight_technical;
        if (weight_sum - 1.0).abs() > 0.001 {
            return Err(AppError::Config(format!(
                "signal weights must sum to 1.0, got {weight_sum:.3}"
            )));
        }
        Ok(())
    }
}
