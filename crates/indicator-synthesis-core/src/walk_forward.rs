//! Walk-forward validation gate (§4.5): does the candidate's in-sample
//! performance carry forward into the next, unseen chunk of history?

use tracing::warn;

use crate::dsr::annualized_sharpe;
use crate::stats::mean;
use crate::types::{Thresholds, WalkForwardGateResult};

/// Default number of evaluation windows.
pub const DEFAULT_N_PERIODS: usize = 5;

/// Default train fraction used to size the rolling-mode training window.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;

/// Minimum observations required per evaluation period before the gate
/// will run at all.
const MIN_OBSERVATIONS_PER_PERIOD: usize = 2;

/// Windowing mode: anchored keeps the training start fixed at the
/// beginning of history and grows the window each step; rolling keeps the
/// training length fixed (sized from the train fraction) and slides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    Anchored,
    Rolling,
}

struct Window {
    train: std::ops::Range<usize>,
    test: std::ops::Range<usize>,
}

/// Split `n` observations into `p` contiguous, near-equal evaluation
/// windows (test sets); any remainder is distributed across the earliest
/// windows so every row is covered.
fn eval_bounds(n: usize, p: usize) -> Vec<(usize, usize)> {
    let base = n / p;
    let remainder = n % p;
    let mut bounds = Vec::with_capacity(p);
    let mut start = 0;
    for i in 0..p {
        let len = base + if i < remainder { 1 } else { 0 };
        bounds.push((start, start + len));
        start += len;
    }
    bounds
}

fn generate_windows(n: usize, p: usize, train_fraction: f64, mode: WindowMode) -> Vec<Window> {
    let bounds = eval_bounds(n, p);
    bounds
        .into_iter()
        .map(|(start, end)| {
            let window_size = end - start;
            let train_start = match mode {
                WindowMode::Anchored => 0,
                WindowMode::Rolling => {
                    let train_size =
                        ((train_fraction * window_size as f64) / (1.0 - train_fraction)) as usize;
                    start.saturating_sub(train_size)
                }
            };
            Window {
                train: train_start..start,
                test: start..end,
            }
        })
        .collect()
}

/// Evaluate the walk-forward gate over `returns` using the default
/// anchored windowing scheme, `p = 5` periods.
pub fn evaluate(returns: &[f64], thresholds: &Thresholds) -> WalkForwardGateResult {
    evaluate_with(
        returns,
        DEFAULT_N_PERIODS,
        DEFAULT_TRAIN_FRACTION,
        WindowMode::Anchored,
        thresholds,
    )
}

/// Evaluate the walk-forward gate with an explicit period count, train
/// fraction, and windowing mode.
pub fn evaluate_with(
    returns: &[f64],
    p: usize,
    train_fraction: f64,
    mode: WindowMode,
    thresholds: &Thresholds,
) -> WalkForwardGateResult {
    let n = returns.len();
    if p == 0 || n < p * MIN_OBSERVATIONS_PER_PERIOD {
        warn!(
            n_observations = n,
            p, "insufficient history for walk-forward windows; gate defaults to pass"
        );
        return WalkForwardGateResult {
            efficiency: 1.0,
            consistency: 1.0,
            degradation: 0.0,
            n_windows: 0,
            passed: true,
            reason: Some(
                "insufficient history for walk-forward windows; gate defaults to pass"
                    .to_string(),
            ),
        };
    }

    let windows = generate_windows(n, p, train_fraction, mode);

    let train_sharpes: Vec<f64> = windows
        .iter()
        .map(|w| annualized_sharpe(&returns[w.train.clone()]))
        .collect();
    let test_sharpes: Vec<f64> = windows
        .iter()
        .map(|w| annualized_sharpe(&returns[w.test.clone()]))
        .collect();

    let mean_train = mean(&train_sharpes);
    let mean_test = mean(&test_sharpes);

    let efficiency = if mean_train > 0.0 {
        mean_test / mean_train
    } else if mean_test <= 0.0 {
        0.0
    } else {
        1.0
    };

    let consistency = test_sharpes.iter().filter(|&&s| s > 0.0).count() as f64 / windows.len() as f64;
    let degradation = 1.0 - efficiency;

    let passed = efficiency >= thresholds.wf_efficiency;
    let reason = if passed {
        None
    } else {
        Some(format!(
            "walk-forward efficiency {:.4} below threshold {:.4}",
            efficiency, thresholds.wf_efficiency
        ))
    };

    WalkForwardGateResult {
        efficiency,
        consistency,
        degradation,
        n_windows: windows.len(),
        passed,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_defaults_to_pass() {
        let returns = vec![0.01, 0.02, 0.01, 0.02];
        let result = evaluate(&returns, &Thresholds::default());
        assert!(result.passed);
        assert_eq!(result.n_windows, 0);
        assert_eq!(result.efficiency, 1.0);
    }

    #[test]
    fn test_consistent_process_has_high_efficiency() {
        let n = 600;
        let returns: Vec<f64> = (0..n)
            .map(|i| 0.0006 + 0.0002 * ((i as f64) * 0.03).sin())
            .collect();
        let result = evaluate(&returns, &Thresholds::default());
        assert_eq!(result.n_windows, DEFAULT_N_PERIODS);
        assert!(result.efficiency > 0.0);
    }

    #[test]
    fn test_regime_shift_lowers_efficiency() {
        let n = 600;
        let mut returns = vec![0.002; n / 2];
        returns.extend(vec![-0.002; n / 2]);
        let result = evaluate(&returns, &Thresholds::default());
        assert!(result.efficiency < 1.0);
    }

    #[test]
    fn test_rolling_mode_produces_same_window_count_as_anchored() {
        let n = 600;
        let returns: Vec<f64> = (0..n).map(|i| (i as f64 * 0.02).sin() * 0.01).collect();
        let anchored = evaluate_with(
            &returns,
            DEFAULT_N_PERIODS,
            DEFAULT_TRAIN_FRACTION,
            WindowMode::Anchored,
            &Thresholds::default(),
        );
        let rolling = evaluate_with(
            &returns,
            DEFAULT_N_PERIODS,
            DEFAULT_TRAIN_FRACTION,
            WindowMode::Rolling,
            &Thresholds::default(),
        );
        assert_eq!(anchored.n_windows, rolling.n_windows);
    }

    #[test]
    fn test_efficiency_is_ratio_of_means_not_mean_of_ratios() {
        // Two windows: one with train Sharpe very small and positive test
        // Sharpe (which would blow up a per-window-ratio average), one
        // balanced. The ratio-of-means formula keeps this well-behaved.
        let mut returns = vec![0.00001; 60];
        returns.extend(vec![0.001; 60]);
        let result = evaluate_with(
            &returns,
            2,
            DEFAULT_TRAIN_FRACTION,
            WindowMode::Anchored,
            &Thresholds::default(),
        );
        assert!(result.efficiency.is_finite());
    }
}
