//! Pipeline orchestrator (§4.8): runs every gate against a
//! `ValidationRequest` and assembles the aggregate `ValidationReport`.

use chrono::Utc;
use rayon::join;

use crate::dsr;
use crate::ic;
use crate::orthogonality;
use crate::pbo;
use crate::stats;
use crate::types::{
    DsrGateResult, IcGateResult, OrthogonalityGateResult, PboGateResult, TrialsInfo,
    ValidationError, ValidationReport, ValidationRequest, WalkForwardGateResult,
};
use crate::walk_forward;

const TOTAL_GATES: u32 = 5;

/// Run the full validation pipeline against `request`.
///
/// The five gates are independent of each other and run concurrently via
/// `rayon::join`, but the fields of the resulting report are always
/// assembled in the same order — `ic`, `dsr`, `pbo`, `walk_forward`,
/// `orthogonality` — regardless of which gate happens to finish first.
pub fn run_validation_pipeline(
    request: &ValidationRequest,
) -> Result<ValidationReport, ValidationError> {
    request.validate()?;

    let forward_returns = request.effective_forward_returns();
    let thresholds = request.thresholds;

    // DSR, PBO, and walk-forward all assess the candidate's own trading
    // performance, so they run on the signal-induced strategy return
    // `sign(s_i) * r_i` rather than the raw market return — only the IC
    // gate cares about the raw forward return directly.
    let strategy_returns = stats::strategy_returns(&request.signals, &request.returns);

    let ((ic_result, dsr_result), (pbo_result, (wf_result, ortho_result))): (
        (IcGateResult, DsrGateResult),
        (PboGateResult, (WalkForwardGateResult, OrthogonalityGateResult)),
    ) = join(
        || {
            join(
                || {
                    ic::evaluate(
                        &request.signals,
                        &forward_returns,
                        ic::DEFAULT_WINDOW,
                        &thresholds,
                    )
                },
                || dsr::evaluate(&strategy_returns, request.n_trials, &thresholds),
            )
        },
        || {
            join(
                || {
                    pbo::evaluate(
                        &strategy_returns,
                        pbo::DEFAULT_N_CANDIDATES,
                        pbo::DEFAULT_N_CHUNKS,
                        &thresholds,
                    )
                },
                || {
                    join(
                        || walk_forward::evaluate(&strategy_returns, &thresholds),
                        || {
                            orthogonality::evaluate(
                                &request.signals,
                                &request.existing_indicators,
                                &thresholds,
                            )
                        },
                    )
                },
            )
        },
    );

    let gates_passed = [
        ic_result.passed,
        dsr_result.passed,
        pbo_result.passed,
        wf_result.passed,
        ortho_result.passed,
    ]
    .iter()
    .filter(|&&p| p)
    .count() as u32;

    let overall_passed = gates_passed == TOTAL_GATES;
    let pass_rate = gates_passed as f64 / TOTAL_GATES as f64;

    let multiple_testing_penalty = dsr::expected_max_sharpe(request.n_trials);
    let trials = TrialsInfo {
        attempted: request.n_trials,
        selected: 1,
        multiple_testing_penalty,
    };

    let recommendations =
        derive_recommendations(&ic_result, &dsr_result, &pbo_result, &wf_result, &ortho_result);

    let summary = if overall_passed {
        format!(
            "'{}' passed {}/{} gates and is eligible for promotion",
            request.indicator_id, gates_passed, TOTAL_GATES
        )
    } else {
        format!(
            "'{}' passed {}/{} gates; remaining issues must be resolved before promotion",
            request.indicator_id, gates_passed, TOTAL_GATES
        )
    };

    Ok(ValidationReport {
        indicator_id: request.indicator_id.clone(),
        timestamp: Utc::now(),
        dsr: dsr_result,
        pbo: pbo_result,
        ic: ic_result,
        walk_forward: wf_result,
        orthogonality: ortho_result,
        trials,
        overall_passed,
        gates_passed,
        total_gates: TOTAL_GATES,
        pass_rate,
        summary,
        recommendations,
    })
}

/// Derive human-readable recommendations from the pattern of gate
/// failures, per §7's summary-level rules. Each rule is independent of
/// the others — a report can carry several recommendations at once — and
/// a clean sweep gets the single "proceed" recommendation instead.
fn derive_recommendations(
    ic: &IcGateResult,
    dsr: &DsrGateResult,
    pbo: &PboGateResult,
    wf: &WalkForwardGateResult,
    ortho: &OrthogonalityGateResult,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if dsr.p_value < 0.5 {
        recommendations.push("Likely chance-driven; redesign.".to_string());
    }
    if pbo.value > 0.7 {
        recommendations.push("Heavy overfitting; simplify parameters.".to_string());
    }
    if ic.mean < 0.0 {
        recommendations.push("Counterproductive signal; reverse or rethink.".to_string());
    }
    if wf.efficiency < 0.3 {
        recommendations.push("Severe IS/OOS degradation; overfit.".to_string());
    }
    if ortho.max_correlation > 0.8 {
        let name = ortho.correlated_with.as_deref().unwrap_or("existing indicator");
        recommendations.push(format!(
            "Redundant with '{name}'; remove or orthogonalize."
        ));
    }

    if recommendations.is_empty() {
        recommendations.push("All gates passed; proceed.".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn synthetic_series(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let signals: Vec<f64> = (0..n)
            .map(|i| ((i as u64).wrapping_mul(seed).wrapping_add(3) % 97) as f64 / 97.0)
            .collect();
        let returns: Vec<f64> = signals
            .iter()
            .map(|s| (s - 0.5) * 0.01 + 0.0003)
            .collect();
        (signals, returns)
    }

    #[test]
    fn test_rejects_invalid_input() {
        let request = ValidationRequest {
            indicator_id: String::new(),
            signals: vec![1.0, 2.0],
            returns: vec![1.0, 2.0],
            forward_returns: None,
            n_trials: 1,
            existing_indicators: BTreeMap::new(),
            thresholds: Default::default(),
        };
        let result = run_validation_pipeline(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let request = ValidationRequest {
            indicator_id: "test".to_string(),
            signals: vec![1.0, 2.0, 3.0],
            returns: vec![1.0, 2.0],
            forward_returns: None,
            n_trials: 1,
            existing_indicators: BTreeMap::new(),
            thresholds: Default::default(),
        };
        assert!(run_validation_pipeline(&request).is_err());
    }

    #[test]
    fn test_minimal_valid_request_runs_to_completion() {
        let (signals, returns) = synthetic_series(5, 11);
        let request = ValidationRequest {
            indicator_id: "tiny".to_string(),
            signals,
            returns,
            forward_returns: None,
            n_trials: 1,
            existing_indicators: BTreeMap::new(),
            thresholds: Default::default(),
        };
        let report = run_validation_pipeline(&request).unwrap();
        assert_eq!(report.total_gates, 5);
        assert_eq!(report.indicator_id, "tiny");
    }

    #[test]
    fn test_high_n_trials_raises_deflation_penalty() {
        let (signals, returns) = synthetic_series(300, 17);
        let low = ValidationRequest {
            indicator_id: "low_trials".to_string(),
            signals: signals.clone(),
            returns: returns.clone(),
            forward_returns: None,
            n_trials: 1,
            existing_indicators: BTreeMap::new(),
            thresholds: Default::default(),
        };
        let high = ValidationRequest {
            n_trials: 500,
            ..low.clone()
        };
        let low_report = run_validation_pipeline(&low).unwrap();
        let high_report = run_validation_pipeline(&high).unwrap();
        assert!(high_report.trials.multiple_testing_penalty >= low_report.trials.multiple_testing_penalty);
    }

    #[test]
    fn test_duplicate_existing_indicator_fails_orthogonality() {
        let (signals, returns) = synthetic_series(200, 23);
        let mut existing = BTreeMap::new();
        existing.insert("duplicate".to_string(), signals.clone());
        let request = ValidationRequest {
            indicator_id: "dup_test".to_string(),
            signals,
            returns,
            forward_returns: None,
            n_trials: 1,
            existing_indicators: existing,
            thresholds: Default::default(),
        };
        let report = run_validation_pipeline(&request).unwrap();
        assert!(!report.orthogonality.passed);
        assert!(!report.overall_passed);
    }

    #[test]
    fn test_gates_passed_matches_recommendation_count_lower_bound() {
        let (signals, returns) = synthetic_series(252, 29);
        let request = ValidationRequest {
            indicator_id: "bounded".to_string(),
            signals,
            returns,
            forward_returns: None,
            n_trials: 10,
            existing_indicators: BTreeMap::new(),
            thresholds: Default::default(),
        };
        let report = run_validation_pipeline(&request).unwrap();
        assert!(report.gates_passed <= report.total_gates);
        assert!((report.pass_rate - report.gates_passed as f64 / 5.0).abs() < 1e-12);
    }

    // Seed scenarios S1-S6 (spec §8). S5 (PBO combination count) and S6
    // (trigger engine) are exercised in pbo.rs and trigger.rs respectively,
    // since they target those gates directly rather than the full pipeline.

    #[test]
    fn test_seed_scenario_s1_flat_signal_fails_ic_and_dsr() {
        let n = 252;
        let signals = vec![1.0; n];
        let returns: Vec<f64> = (0..n).map(|i| 0.01 * ((i as f64) * 0.3).sin()).collect();
        let request = ValidationRequest {
            indicator_id: "s1_flat_signal".to_string(),
            signals,
            returns,
            forward_returns: None,
            n_trials: 100,
            existing_indicators: BTreeMap::new(),
            thresholds: Default::default(),
        };
        let report = run_validation_pipeline(&request).unwrap();
        assert_eq!(report.ic.mean, 0.0);
        assert!(!report.ic.passed);
        assert!(report.dsr.p_value < 0.5);
        assert!(!report.overall_passed);
    }

    #[test]
    fn test_seed_scenario_s2_drifting_signal_passes_ic_and_walk_forward() {
        let n = 252;
        let returns: Vec<f64> = (0..n)
            .map(|i| 0.001 + 0.005 * ((i as f64) * 0.1).sin())
            .collect();
        // signals[i] = sign(returns[i+1]): the default forward-return
        // derivation (returns shifted left by one) makes this a perfect
        // next-period predictor.
        let mut signals: Vec<f64> = (0..n - 1)
            .map(|i| if returns[i + 1] >= 0.0 { 1.0 } else { -1.0 })
            .collect();
        signals.push(0.0);
        let request = ValidationRequest {
            indicator_id: "s2_drifting_signal".to_string(),
            signals,
            returns,
            forward_returns: None,
            n_trials: 1,
            existing_indicators: BTreeMap::new(),
            thresholds: Default::default(),
        };
        let report = run_validation_pipeline(&request).unwrap();
        assert!(report.ic.mean > 0.05);
        assert!((report.walk_forward.efficiency - 1.0).abs() < 0.5);
        assert!(report.overall_passed);
    }

    #[test]
    fn test_seed_scenario_s3_high_trial_count_deflates_identical_sharpes() {
        let n = 252;
        // A constant, always-long signal means the strategy return equals
        // the raw return series, so the engineered Sharpe (~1.5
        // annualized) carries straight through to the DSR gate.
        let returns: Vec<f64> = (0..n)
            .map(|i| 0.00095 + 0.0141 * ((i as f64) * std::f64::consts::TAU / n as f64).sin())
            .collect();
        let signals = vec![1.0; n];

        for label in ["strategy_a", "strategy_b"] {
            let request = ValidationRequest {
                indicator_id: label.to_string(),
                signals: signals.clone(),
                returns: returns.clone(),
                forward_returns: None,
                n_trials: 50,
                existing_indicators: BTreeMap::new(),
                thresholds: Default::default(),
            };
            let report = run_validation_pipeline(&request).unwrap();
            assert!(report.dsr.p_value < 0.5);
            assert!(!report.overall_passed);
        }
    }

    #[test]
    fn test_seed_scenario_s4_existing_twin_indicator_fails_orthogonality() {
        let (signals, returns) = synthetic_series(200, 41);
        let mut existing = BTreeMap::new();
        existing.insert("twin".to_string(), signals.clone());
        let request = ValidationRequest {
            indicator_id: "s4_candidate".to_string(),
            signals,
            returns,
            forward_returns: None,
            n_trials: 1,
            existing_indicators: existing,
            thresholds: Default::default(),
        };
        let report = run_validation_pipeline(&request).unwrap();
        assert!((report.orthogonality.max_correlation - 1.0).abs() < 1e-9);
        assert_eq!(report.orthogonality.correlated_with.as_deref(), Some("twin"));
        assert!(!report.orthogonality.passed);
    }

    #[test]
    fn test_recommendation_text_matches_spec_wording_per_failure_pattern() {
        let ic = IcGateResult {
            mean: -0.01,
            std: 0.01,
            icir: 0.0,
            hit_rate: 0.4,
            n_observations: 10,
            significant: false,
            passed: false,
            reason: Some("mean IC below threshold".to_string()),
        };
        let dsr = DsrGateResult {
            sharpe: 0.1,
            expected_max_sharpe: 2.0,
            standard_error: 0.5,
            p_value: 0.2,
            passed: false,
            reason: Some("DSR p-value below threshold".to_string()),
        };
        let pbo = PboGateResult {
            value: 0.8,
            n_combinations: 70,
            scheme: "time-shift".to_string(),
            passed: false,
            reason: Some("PBO above threshold".to_string()),
        };
        let wf = WalkForwardGateResult {
            efficiency: 0.1,
            consistency: 0.2,
            degradation: 0.9,
            n_windows: 5,
            passed: false,
            reason: Some("efficiency below threshold".to_string()),
        };
        let ortho = OrthogonalityGateResult {
            max_correlation: 0.95,
            correlated_with: Some("momentum_20d".to_string()),
            vif: Some(6.0),
            n_existing_indicators: 1,
            passed: false,
            reason: Some("correlation above threshold".to_string()),
        };

        let recs = derive_recommendations(&ic, &dsr, &pbo, &wf, &ortho);
        assert!(recs.contains(&"Likely chance-driven; redesign.".to_string()));
        assert!(recs.contains(&"Heavy overfitting; simplify parameters.".to_string()));
        assert!(recs.contains(&"Counterproductive signal; reverse or rethink.".to_string()));
        assert!(recs.contains(&"Severe IS/OOS degradation; overfit.".to_string()));
        assert!(recs.iter().any(|r| r.contains("momentum_20d")));
    }

    #[test]
    fn test_recommendation_defaults_to_proceed_when_nothing_triggers() {
        let ic = IcGateResult {
            mean: 0.05,
            std: 0.01,
            icir: 5.0,
            hit_rate: 0.7,
            n_observations: 200,
            significant: true,
            passed: true,
            reason: None,
        };
        let dsr = DsrGateResult {
            sharpe: 1.0,
            expected_max_sharpe: 0.1,
            standard_error: 0.1,
            p_value: 0.99,
            passed: true,
            reason: None,
        };
        let pbo = PboGateResult {
            value: 0.1,
            n_combinations: 70,
            scheme: "time-shift".to_string(),
            passed: true,
            reason: None,
        };
        let wf = WalkForwardGateResult {
            efficiency: 0.9,
            consistency: 0.8,
            degradation: 0.1,
            n_windows: 5,
            passed: true,
            reason: None,
        };
        let ortho = OrthogonalityGateResult {
            max_correlation: 0.1,
            correlated_with: None,
            vif: None,
            n_existing_indicators: 0,
            passed: true,
            reason: None,
        };

        let recs = derive_recommendations(&ic, &dsr, &pbo, &wf, &ortho);
        assert_eq!(recs, vec!["All gates passed; proceed.".to_string()]);
    }
}
