//! Orthogonality gate (§4.6): does the candidate add information beyond
//! what the existing indicator registry already captures?

use std::collections::BTreeMap;

use crate::stats::{pearson, vif as compute_vif};
use crate::types::{OrthogonalityGateResult, Thresholds};

/// Evaluate the orthogonality gate. `existing_indicators` is iterated in
/// key order (it is a `BTreeMap`), so when two indicators tie for the
/// highest correlation the first one alphabetically is reported.
pub fn evaluate(
    signals: &[f64],
    existing_indicators: &BTreeMap<String, Vec<f64>>,
    thresholds: &Thresholds,
) -> OrthogonalityGateResult {
    if existing_indicators.is_empty() {
        return OrthogonalityGateResult {
            max_correlation: 0.0,
            correlated_with: None,
            vif: None,
            n_existing_indicators: 0,
            passed: true,
            reason: None,
        };
    }

    let mut max_correlation = 0.0_f64;
    let mut correlated_with: Option<String> = None;
    for (name, series) in existing_indicators {
        let corr = pearson(signals, series).abs();
        if corr > max_correlation {
            max_correlation = corr;
            correlated_with = Some(name.clone());
        }
    }

    let predictors: Vec<&[f64]> = existing_indicators.values().map(|v| v.as_slice()).collect();
    let vif = compute_vif(signals, &predictors);

    let correlation_ok = max_correlation <= thresholds.max_correlation;
    let vif_ok = vif.map(|v| v <= thresholds.max_vif).unwrap_or(true);
    let passed = correlation_ok && vif_ok;

    let reason = if passed {
        None
    } else if !correlation_ok {
        Some(format!(
            "correlation {:.4} with '{}' above threshold {:.4}",
            max_correlation,
            correlated_with.clone().unwrap_or_default(),
            thresholds.max_correlation
        ))
    } else {
        Some(format!(
            "VIF {:.4} above threshold {:.4}",
            vif.unwrap_or(f64::INFINITY),
            thresholds.max_vif
        ))
    };

    OrthogonalityGateResult {
        max_correlation,
        correlated_with,
        vif,
        n_existing_indicators: existing_indicators.len(),
        passed,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry_always_passes() {
        let signals = vec![1.0, 2.0, 3.0];
        let existing = BTreeMap::new();
        let result = evaluate(&signals, &existing, &Thresholds::default());
        assert!(result.passed);
        assert_eq!(result.max_correlation, 0.0);
        assert!(result.correlated_with.is_none());
    }

    #[test]
    fn test_identical_indicator_fails_gate() {
        let signals: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let mut existing = BTreeMap::new();
        existing.insert("momentum_20d".to_string(), signals.clone());
        let result = evaluate(&signals, &existing, &Thresholds::default());
        assert!(!result.passed);
        assert_eq!(result.correlated_with.as_deref(), Some("momentum_20d"));
        assert!((result.max_correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_alphabetic_tie_break() {
        let signals: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let mut existing = BTreeMap::new();
        existing.insert("zzz_indicator".to_string(), signals.clone());
        existing.insert("aaa_indicator".to_string(), signals.clone());
        let result = evaluate(&signals, &existing, &Thresholds::default());
        assert_eq!(result.correlated_with.as_deref(), Some("aaa_indicator"));
    }

    #[test]
    fn test_unrelated_indicator_passes() {
        let signals: Vec<f64> = (0..50).map(|i| ((i as f64) * 0.3).sin()).collect();
        let unrelated: Vec<f64> = (0..50).map(|i| ((i * 13 + 7) % 11) as f64).collect();
        let mut existing = BTreeMap::new();
        existing.insert("unrelated".to_string(), unrelated);
        let result = evaluate(&signals, &existing, &Thresholds::default());
        assert!(result.max_correlation < 0.7);
    }
}
