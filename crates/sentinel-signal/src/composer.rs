//! Composite signal generation.
//!
//! Blends the external advisory report, the locally computed technical
//! score, and the market-regime adjustment into one action plus
//! confidence. Advisory absence degrades to technical-only scoring
//! rather than aborting.

use rust_decimal::prelude::ToPrimitive;
use sentinel_core::{BarWindow, FactorScores, Regime, Signal, SignalAction};
use sentinel_providers::AdvisoryReport;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::technical::technical_score;

/// Composer weights and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Advisory strategy weight.
    #[serde(default = "default_weight_advisory")]
    pub weight_advisory: f64,
    /// Advisory risk-score weight.
    #[serde(default = "default_weight_risk")]
    pub weight_risk: f64,
    /// Advisory sentiment weight.
    #[serde(default = "default_weight_sentiment")]
    pub weight_sentiment: f64,
    /// Local technical-score weight.
    #[serde(default = "default_weight_technical")]
    pub weight_technical: f64,

    /// Minimum composite confidence to act.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Added to the threshold under a volatile regime.
    #[serde(default = "default_volatile_threshold_bump")]
    pub volatile_threshold_bump: f64,

    /// Confidence boost for trend-aligned recommendations.
    #[serde(default = "default_trend_boost")]
    pub trend_boost: f64,
    /// Confidence dampening for contrarian recommendations.
    #[serde(default = "default_contrarian_dampen")]
    pub contrarian_dampen: f64,
    /// Confidence reduction under a volatile regime.
    #[serde(default = "default_volatile_reduction")]
    pub volatile_reduction: f64,
}

fn default_weight_advisory() -> f64 {
    0.35
}

fn default_weight_risk() -> f64 {
    0.20
}

fn default_weight_sentiment() -> f64 {
    0.25
}

fn default_weight_technical() -> f64 {
    0.20
}

fn default_min_confidence() -> f64 {
    0.60
}

fn default_volatile_threshold_bump() -> f64 {
    0.10
}

fn default_trend_boost() -> f64 {
    0.05
}

fn default_contrarian_dampen() -> f64 {
    0.10
}

fn default_volatile_reduction() -> f64 {
    0.15
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            weight_advisory: default_weight_advisory(),
            weight_risk: default_weight_risk(),
            weight_sentiment: default_weight_sentiment(),
            weight_technical: default_weight_technical(),
            min_confidence: default_min_confidence(),
            volatile_threshold_bump: default_volatile_threshold_bump(),
            trend_boost: default_trend_boost(),
            contrarian_dampen: default_contrarian_dampen(),
            volatile_reduction: default_volatile_reduction(),
        }
    }
}

/// Composes one immutable [`Signal`] per cycle.
pub struct SignalComposer {
    config: SignalConfig,
}

impl SignalComposer {
    #[must_use]
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Compose a signal from the advisory report (if any), the bar
    /// window, and the regime classification (if any).
    pub fn compose(
        &self,
        symbol: &str,
        advisory: Option<&AdvisoryReport>,
        bars: &BarWindow,
        regime: Option<Regime>,
    ) -> Signal {
        let closes: Vec<f64> = bars
            .closes()
            .iter()
            .map(|d| d.to_f64().unwrap_or(0.0))
            .collect();
        let bullish = technical_score(&closes);

        let (direction, scores, mut confidence) = match advisory {
            Some(report) => {
                let Some(_) = report.recommendation.side() else {
                    return Signal::hold(symbol, "advisory recommends hold");
                };
                // Technical factor follows the recommendation's
                // direction: a bearish market supports a sell.
                let technical = match report.recommendation {
                    SignalAction::Sell => 1.0 - bullish,
                    _ => bullish,
                };
                let scores = FactorScores {
                    advisory: report.confidence,
                    risk: report.risk_score,
                    sentiment: report.sentiment_score,
                    technical,
                };
                let confidence = self.config.weight_advisory * scores.advisory
                    + self.config.weight_risk * scores.risk
                    + self.config.weight_sentiment * scores.sentiment
                    + self.config.weight_technical * scores.technical;
                (report.recommendation, scores, confidence)
            }
            None => {
                // Technical-only degraded mode.
                let direction = if bullish >= 0.5 {
                    SignalAction::Buy
                } else {
                    SignalAction::Sell
                };
                let technical = match direction {
                    SignalAction::Sell => 1.0 - bullish,
                    _ => bullish,
                };
                let scores = FactorScores {
                    technical,
                    ..FactorScores::neutral()
                };
                (direction, scores, technical)
            }
        };

        // Regime shapes both the confidence and the bar to clear.
        let mut threshold = self.config.min_confidence;
        if let Some(regime) = regime {
            if regime.aligns_with(direction) {
                confidence += self.config.trend_boost;
            } else if regime.opposes(direction) {
                confidence -= self.config.contrarian_dampen;
            }
            if regime.is_volatile() {
                confidence -= self.config.volatile_reduction;
                threshold += self.config.volatile_threshold_bump;
            }
        }
        confidence = confidence.clamp(0.0, 1.0);

        debug!(
            symbol = %symbol,
            direction = %direction,
            confidence = confidence,
            threshold = threshold,
            advisory = advisory.is_some(),
            "Signal composed"
        );

        if confidence < threshold {
            let mut signal = Signal::hold(
                symbol,
                format!("confidence {confidence:.2} below required {threshold:.2}"),
            );
            signal.confidence = confidence;
            signal.scores = scores;
            signal.regime = regime;
            return signal;
        }

        Signal {
            symbol: symbol.to_string(),
            action: direction,
            confidence,
            scores,
            regime,
            reason: format!("confidence {confidence:.2} cleared threshold {threshold:.2}"),
            created_at: chrono::Utc::now(),
        }
    }
}
