//! Information Coefficient analyser (§4.2): rolling rank correlation
//! between a signal and its forward return, plus the gate built on top.

use crate::stats::{spearman, std_dev};
use crate::types::{IcGateResult, IcRecord, IcStats, Thresholds};

/// Default rolling window length when the caller does not specify one.
pub const DEFAULT_WINDOW: usize = 20;

/// Minimum window length.
pub const MIN_WINDOW: usize = 2;

/// Compute the rolling IC series of `signals` against `forward_returns`.
///
/// A requested window larger than the available history yields no valid
/// windows at all: `(w-1..n)` is empty whenever `w > n`, so the series
/// comes back zero-length rather than being silently shrunk to fit.
pub fn compute_series(signals: &[f64], forward_returns: &[f64], window: usize) -> Vec<IcRecord> {
    let n = signals.len().min(forward_returns.len());
    if n == 0 {
        return Vec::new();
    }
    let w = window.max(MIN_WINDOW);

    (w - 1..n)
        .map(|i| {
            let start = i + 1 - w;
            let ic_value = spearman(&signals[start..=i], &forward_returns[start..=i]);
            IcRecord {
                period_index: i,
                ic_value,
            }
        })
        .collect()
}

/// Summary statistics over an IC series.
pub fn stats(series: &[IcRecord]) -> IcStats {
    let n = series.len();
    if n == 0 {
        return IcStats {
            mean: 0.0,
            std: 0.0,
            icir: 0.0,
            hit_rate: 0.0,
            n_observations: 0,
            significant: false,
        };
    }

    let values: Vec<f64> = series.iter().map(|r| r.ic_value).collect();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = std_dev(&values);
    let icir = if std == 0.0 { 0.0 } else { mean / std };
    let hit_rate = values.iter().filter(|&&v| v > 0.0).count() as f64 / n as f64;

    let se = std / (n as f64).sqrt();
    let significant = if se < 1e-15 {
        mean.abs() > 1e-12
    } else {
        (mean.abs() / se) > 1.96
    };

    IcStats {
        mean,
        std,
        icir,
        hit_rate,
        n_observations: n,
        significant,
    }
}

/// Evaluate the IC gate: compute the rolling series, its statistics, and
/// the pass/fail decision against the configured thresholds.
pub fn evaluate(
    signals: &[f64],
    forward_returns: &[f64],
    window: usize,
    thresholds: &Thresholds,
) -> IcGateResult {
    let series = compute_series(signals, forward_returns, window);
    let s = stats(&series);

    let passed = s.mean >= thresholds.ic_mean && s.std <= thresholds.ic_std;
    let reason = if passed {
        None
    } else if s.mean < thresholds.ic_mean {
        Some(format!(
            "mean IC {:.4} below threshold {:.4}",
            s.mean, thresholds.ic_mean
        ))
    } else {
        Some(format!(
            "IC std {:.4} above threshold {:.4}",
            s.std, thresholds.ic_std
        ))
    };

    IcGateResult {
        mean: s.mean,
        std: s.std,
        icir: s.icir,
        hit_rate: s.hit_rate,
        n_observations: s.n_observations,
        significant: s.significant,
        passed,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_length_matches_spec() {
        let n = 50;
        let w = 20;
        let signals: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let forward: Vec<f64> = (0..n).map(|i| (i as f64) * 2.0).collect();
        let series = compute_series(&signals, &forward, w);
        assert_eq!(series.len(), n - w + 1);
    }

    #[test]
    fn test_constant_signal_gives_zero_ic() {
        let n = 30;
        let signals = vec![1.0; n];
        let forward: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let series = compute_series(&signals, &forward, 10);
        assert!(series.iter().all(|r| r.ic_value == 0.0));
        let s = stats(&series);
        assert_eq!(s.mean, 0.0);
    }

    #[test]
    fn test_gate_fails_on_flat_signal() {
        let n = 252;
        let signals = vec![1.0; n];
        let forward: Vec<f64> = (0..n).map(|i| ((i * 7919) % 97) as f64).collect();
        let result = evaluate(&signals, &forward, DEFAULT_WINDOW, &Thresholds::default());
        assert_eq!(result.mean, 0.0);
        assert!(!result.passed);
    }

    #[test]
    fn test_gate_passes_on_perfectly_predictive_signal() {
        let n = 252;
        let forward: Vec<f64> = (0..n).map(|i| ((i as f64) * 0.37).sin()).collect();
        let signals = forward.clone();
        let result = evaluate(&signals, &forward, DEFAULT_WINDOW, &Thresholds::default());
        assert!(result.mean > 0.9);
        assert!(result.passed);
    }

    #[test]
    fn test_minimum_length_below_default_window_gives_empty_series() {
        // spec.md §8 boundary behaviour: n = 2 minimum with the default
        // window (20) yields zero valid windows, not a shrunk one-element
        // series. std = 0 on an empty series is the documented neutral
        // decision, not a spuriously perfect ±1 two-point correlation.
        let signals = vec![1.0, 2.0];
        let forward = vec![2.0, 1.0];
        let series = compute_series(&signals, &forward, DEFAULT_WINDOW);
        assert_eq!(series.len(), 0);
        let s = stats(&series);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.std, 0.0);
    }

    #[test]
    fn test_window_equal_to_length_gives_single_window() {
        let signals = vec![1.0, 2.0];
        let forward = vec![2.0, 1.0];
        let series = compute_series(&signals, &forward, 2);
        assert_eq!(series.len(), 1);
    }
}
