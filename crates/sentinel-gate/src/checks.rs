//! Individual guardrail check results.

use serde::Serialize;

/// One named pass/fail safety check.
///
/// A validation produces an ordered list of these; evaluation stops at
/// the first failure, and the list holds every check executed so far
/// for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardrailCheck {
    pub name: &'static str,
    pub passed: bool,
    pub message: String,
    pub observed: String,
    pub threshold: String,
}

impl GuardrailCheck {
    pub fn pass(
        name: &'static str,
        observed: impl ToString,
        threshold: impl ToString,
    ) -> Self {
        Self {
            name,
            passed: true,
            message: String::new(),
            observed: observed.to_string(),
            threshold: threshold.to_string(),
        }
    }

    pub fn fail(
        name: &'static str,
        message: impl Into<String>,
        observed: impl ToString,
        threshold: impl ToString,
    ) -> Self {
        Self {
            name,
            passed: false,
            message: message.into(),
            observed: observed.to_string(),
            threshold: threshold.to_string(),
        }
    }
}

/// Validation outcome with the full audit list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateVerdict {
    pub allowed: bool,
    /// Rejection reason (first failing check's message), empty when
    /// allowed.
    pub reason: String,
    pub checks: Vec<GuardrailCheck>,
}

impl GateVerdict {
    pub fn allowed(checks: Vec<GuardrailCheck>) -> Self {
        Self {
            allowed: true,
            reason: String::new(),
            checks,
        }
    }

    pub fn rejected(checks: Vec<GuardrailCheck>) -> Self {
        let reason = checks
            .iter()
            .find(|c| !c.passed)
            .map(|c| c.message.clone())
            .unwrap_or_default();
        Self {
            allowed: false,
            reason,
            checks,
        }
    }
}
