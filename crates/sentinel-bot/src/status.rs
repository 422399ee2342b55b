//! Read-only engine status snapshot.

use sentinel_core::{Position, Signal};
use sentinel_gate::GuardrailState;
use sentinel_telemetry::{Decision, SessionSnapshot};
use serde::Serialize;

use crate::config::EngineConfig;

/// Point-in-time engine state for dashboards and CLIs.
///
/// Everything here is a defensive copy; mutating a snapshot never
/// touches engine state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub state: String,
    pub config: EngineConfig,
    pub session: SessionSnapshot,
    pub guardrails: GuardrailState,
    pub open_positions: Vec<Position>,
    pub last_signal: Option<Signal>,
    pub recent_decisions: Vec<Decision>,
}
