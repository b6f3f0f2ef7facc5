//! Data model for the validation core: requests, thresholds, gate results,
//! and the aggregate report. Every type here is plain data — construction
//! happens at the pipeline boundary, values are read-only once built.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Configurable thresholds for each gate, with the documented defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub dsr_p_value: f64,
    pub pbo: f64,
    pub ic_mean: f64,
    pub ic_std: f64,
    pub wf_efficiency: f64,
    pub max_correlation: f64,
    pub max_vif: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            dsr_p_value: 0.95,
            pbo: 0.5,
            ic_mean: 0.02,
            ic_std: 0.03,
            wf_efficiency: 0.5,
            max_correlation: 0.7,
            max_vif: 5.0,
        }
    }
}

impl Thresholds {
    /// Validate that every field falls within its documented range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.dsr_p_value) {
            return Err(ValidationError::InvalidInput(
                "dsr_p_value must be in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pbo) {
            return Err(ValidationError::InvalidInput(
                "pbo threshold must be in [0, 1]".to_string(),
            ));
        }
        if self.ic_std < 0.0 {
            return Err(ValidationError::InvalidInput(
                "ic_std threshold must be >= 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_correlation) {
            return Err(ValidationError::InvalidInput(
                "max_correlation must be in [0, 1]".to_string(),
            ));
        }
        if self.max_vif <= 0.0 {
            return Err(ValidationError::InvalidInput(
                "max_vif must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input contract for `pipeline::run_validation_pipeline`.
///
/// `existing_indicators` is a `BTreeMap` rather than a `HashMap` so that
/// iteration order is deterministic and alphabetic — this pins down the
/// "most correlated" tie-break in the orthogonality gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub indicator_id: String,
    pub signals: Vec<f64>,
    pub returns: Vec<f64>,
    #[serde(default)]
    pub forward_returns: Option<Vec<f64>>,
    #[serde(default = "default_n_trials")]
    pub n_trials: u32,
    #[serde(default)]
    pub existing_indicators: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_n_trials() -> u32 {
    1
}

impl ValidationRequest {
    /// Enforce the invariants from the data model: equal, finite, non-empty
    /// lengths across signals/returns/forward_returns/existing indicators,
    /// a valid trial count, and in-range thresholds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.indicator_id.trim().is_empty() {
            return Err(ValidationError::InvalidInput(
                "indicator_id must not be empty".to_string(),
            ));
        }
        let n = self.signals.len();
        if n < 2 {
            return Err(ValidationError::InvalidInput(
                "signals and returns must have length >= 2".to_string(),
            ));
        }
        if self.returns.len() != n {
            return Err(ValidationError::InvalidInput(
                "returns must be the same length as signals".to_string(),
            ));
        }
        if let Some(f) = &self.forward_returns {
            if f.len() != n {
                return Err(ValidationError::InvalidInput(
                    "forward_returns must be the same length as signals".to_string(),
                ));
            }
            if !f.iter().all(|v| v.is_finite()) {
                return Err(ValidationError::InvalidInput(
                    "forward_returns must be finite".to_string(),
                ));
            }
        }
        if !self.signals.iter().all(|v| v.is_finite()) {
            return Err(ValidationError::InvalidInput(
                "signals must be finite".to_string(),
            ));
        }
        if !self.returns.iter().all(|v| v.is_finite()) {
            return Err(ValidationError::InvalidInput(
                "returns must be finite".to_string(),
            ));
        }
        if self.n_trials < 1 {
            return Err(ValidationError::InvalidInput(
                "n_trials must be >= 1".to_string(),
            ));
        }
        for (name, series) in &self.existing_indicators {
            if series.len() != n {
                return Err(ValidationError::InvalidInput(format!(
                    "existing indicator '{name}' has length {} but expected {n}",
                    series.len()
                )));
            }
            if !series.iter().all(|v| v.is_finite()) {
                return Err(ValidationError::InvalidInput(format!(
                    "existing indicator '{name}' contains non-finite values"
                )));
            }
        }
        self.thresholds.validate()
    }

    /// The forward-return series to use: the caller-supplied one, or R
    /// shifted left by one period with a trailing zero.
    pub fn effective_forward_returns(&self) -> Vec<f64> {
        match &self.forward_returns {
            Some(f) => f.clone(),
            None => {
                let mut shifted: Vec<f64> = self.returns.iter().skip(1).copied().collect();
                shifted.push(0.0);
                shifted
            }
        }
    }
}

/// A single rolling-window IC observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcRecord {
    pub period_index: usize,
    pub ic_value: f64,
}

/// Summary statistics over an IC series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcStats {
    pub mean: f64,
    pub std: f64,
    pub icir: f64,
    pub hit_rate: f64,
    pub n_observations: usize,
    pub significant: bool,
}

/// Result of the Information Coefficient gate (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcGateResult {
    pub mean: f64,
    pub std: f64,
    pub icir: f64,
    pub hit_rate: f64,
    pub n_observations: usize,
    pub significant: bool,
    pub passed: bool,
    pub reason: Option<String>,
}

/// Result of the Deflated Sharpe Ratio gate (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsrGateResult {
    pub sharpe: f64,
    pub expected_max_sharpe: f64,
    pub standard_error: f64,
    pub p_value: f64,
    pub passed: bool,
    pub reason: Option<String>,
}

/// Result of the PBO / CSCV gate (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PboGateResult {
    pub value: f64,
    pub n_combinations: usize,
    pub scheme: String,
    pub passed: bool,
    pub reason: Option<String>,
}

/// Result of the walk-forward gate (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardGateResult {
    pub efficiency: f64,
    pub consistency: f64,
    pub degradation: f64,
    pub n_windows: usize,
    pub passed: bool,
    pub reason: Option<String>,
}

/// Result of the orthogonality gate (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrthogonalityGateResult {
    pub max_correlation: f64,
    pub correlated_with: Option<String>,
    pub vif: Option<f64>,
    pub n_existing_indicators: usize,
    pub passed: bool,
    pub reason: Option<String>,
}

/// Trial-counting metadata for multiple-testing correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialsInfo {
    pub attempted: u32,
    pub selected: u32,
    pub multiple_testing_penalty: f64,
}

/// The aggregate output of `pipeline::run_validation_pipeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub indicator_id: String,
    pub timestamp: DateTime<Utc>,
    pub dsr: DsrGateResult,
    pub pbo: PboGateResult,
    pub ic: IcGateResult,
    pub walk_forward: WalkForwardGateResult,
    pub orthogonality: OrthogonalityGateResult,
    pub trials: TrialsInfo,
    pub overall_passed: bool,
    pub gates_passed: u32,
    pub total_gates: u32,
    pub pass_rate: f64,
    pub summary: String,
    pub recommendations: Vec<String>,
}

/// The five inputs the trigger engine evaluates (§4.7).
///
/// `days_since_last_attempt = None` is the "never attempted" sentinel —
/// it satisfies the cool-down check unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerConditions {
    pub regime_gap_detected: bool,
    pub rolling_ic_30day: f64,
    pub ic_decay_days: u32,
    pub days_since_last_attempt: Option<u32>,
    pub active_indicator_count: u32,
    pub max_indicator_capacity: u32,
}

/// Outcome of `trigger::should_trigger_generation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDecision {
    pub should_trigger: bool,
    pub reasons: Vec<String>,
    pub summary: String,
}
