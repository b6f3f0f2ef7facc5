//! Statistical primitives shared by every gate: ranks, correlation, moments,
//! the Gaussian CDF/inverse-CDF, and the OLS machinery behind VIF.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

/// Ordinal rank (1-based) of each element within `x`, with average-rank
/// tie breaking: equal values (within 1e-15) share the mean of the
/// contiguous ordinal positions they occupy. Returns an empty vector for
/// empty input rather than failing.
pub fn ranks(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let mut idx: Vec<usize> = (0..n).collect();
    idx.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap());

    let mut result = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && (x[idx[j + 1]] - x[idx[i]]).abs() < 1e-15 {
            j += 1;
        }
        let avg_rank = ((i + 1) + (j + 1)) as f64 / 2.0;
        for &k in &idx[i..=j] {
            result[k] = avg_rank;
        }
        i = j + 1;
    }
    result
}

/// The trading return a signal induces against a market return series:
/// `sign(s_i) * r_i`. A signal of exactly zero abstains — it contributes
/// zero to the strategy return rather than inheriting the market return's
/// sign, matching the data model's "constant-zero S implies zero IC and
/// zero strategy return" invariant.
pub fn strategy_returns(signals: &[f64], returns: &[f64]) -> Vec<f64> {
    let n = signals.len().min(returns.len());
    (0..n)
        .map(|i| {
            let sign = if signals[i] > 0.0 {
                1.0
            } else if signals[i] < 0.0 {
                -1.0
            } else {
                0.0
            };
            sign * returns[i]
        })
        .collect()
}

/// Sample mean. Zero for empty input.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (denominator n-1). Zero for n < 2 or when the
/// variance is below the 1e-15 floor.
pub fn std_dev(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    if variance < 1e-15 {
        0.0
    } else {
        variance.sqrt()
    }
}

/// Downside deviation: sqrt(mean(min(r - target, 0)^2)), denominator n
/// (not the count of negative observations — this matches the reference
/// convention the spec fixes in its open questions).
pub fn downside_deviation(returns: &[f64], target: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let sum_sq: f64 = returns.iter().map(|r| (r - target).min(0.0).powi(2)).sum();
    (sum_sq / n).sqrt()
}

/// Pearson product-moment correlation. Zero if either series has
/// near-zero variance (below the 1e-15 floor). Clamped to [-1, 1].
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }

    if vx < 1e-15 || vy < 1e-15 {
        return 0.0;
    }
    (cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0)
}

/// Spearman rank correlation: Pearson correlation of the ranks of each series.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let rx = ranks(x);
    let ry = ranks(y);
    pearson(&rx, &ry)
}

/// Standard normal CDF, Φ(x).
pub fn gaussian_cdf(x: f64) -> f64 {
    standard_normal().cdf(x)
}

/// Standard normal quantile function, Φ⁻¹(p). `p` is clamped to
/// `[1e-12, 1 - 1e-12]` to keep the underlying solver well-behaved as
/// `p` approaches 0 or 1 (see spec's open question on T > 1e6).
pub fn gaussian_inv_cdf(p: f64) -> f64 {
    let clamped = p.clamp(1e-12, 1.0 - 1e-12);
    standard_normal().inverse_cdf(clamped)
}

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal parameters are always valid")
}

/// R² of an OLS regression of `y` on `predictors` (centered, no intercept
/// term needed once centered). Uses an SVD-based least-squares solve so a
/// singular design matrix still yields a (minimum-norm) fit rather than
/// failing — a candidate perfectly explained by its predictors naturally
/// comes out at R² ≈ 1 this way, which is exactly the case the VIF gate
/// needs to detect.
pub fn ols_r_squared(y: &[f64], predictors: &[&[f64]]) -> f64 {
    let n = y.len();
    let k = predictors.len();
    if k == 0 || n == 0 {
        return 0.0;
    }

    let y_mean = mean(y);
    let y_centered: Vec<f64> = y.iter().map(|v| v - y_mean).collect();
    let sst: f64 = y_centered.iter().map(|v| v * v).sum();
    if sst < 1e-15 {
        return 0.0;
    }

    let mut data = Vec::with_capacity(n * k);
    let col_means: Vec<f64> = predictors.iter().map(|p| mean(p)).collect();
    for i in 0..n {
        for (p, &cm) in predictors.iter().zip(&col_means) {
            data.push(p[i] - cm);
        }
    }
    let x = DMatrix::from_row_slice(n, k, &data);
    let yv = DVector::from_row_slice(&y_centered);

    let svd = x.clone().svd(true, true);
    let beta = match svd.solve(&yv, 1e-12) {
        Ok(b) => b,
        Err(_) => {
            debug!("OLS design matrix is singular; treating fit as perfect (R^2 = 1)");
            return 1.0;
        }
    };

    let fitted = &x * &beta;
    let residuals = &yv - &fitted;
    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    (1.0 - ssr / sst).clamp(0.0, 1.0)
}

/// Variance Inflation Factor of `y` regressed on `predictors`. `None` if
/// there are no predictors (VIF undefined); `Some(f64::INFINITY)` if R² is
/// at or above `1 - 1e-12` (perfect collinearity).
pub fn vif(y: &[f64], predictors: &[&[f64]]) -> Option<f64> {
    if predictors.is_empty() {
        return None;
    }
    let r2 = ols_r_squared(y, predictors);
    if r2 >= 1.0 - 1e-12 {
        Some(f64::INFINITY)
    } else {
        Some(1.0 / (1.0 - r2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_no_ties() {
        let x = vec![3.0, 1.0, 2.0];
        assert_eq!(ranks(&x), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ranks_with_ties() {
        let x = vec![1.0, 2.0, 2.0, 3.0];
        assert_eq!(ranks(&x), vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn test_ranks_idempotent_ordering() {
        let x = vec![5.0, 1.0, 5.0, 3.0, 1.0];
        let r1 = ranks(&x);
        let r2 = ranks(&r1);
        // Ranking an already-ranked series preserves relative order.
        for i in 0..x.len() {
            for j in 0..x.len() {
                assert_eq!(
                    r1[i] <= r1[j],
                    r2[i] <= r2[j],
                    "ordering changed between rank passes"
                );
            }
        }
    }

    #[test]
    fn test_pearson_self_and_negation() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let neg: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((pearson(&x, &x) - 1.0).abs() < 1e-9);
        assert!((pearson(&x, &neg) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_zero_variance() {
        let x = vec![1.0, 1.0, 1.0, 1.0];
        let y = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(pearson(&x, &y), 0.0);
    }

    #[test]
    fn test_spearman_self_and_negation() {
        let x: Vec<f64> = vec![5.0, 3.0, 8.0, 1.0, 9.0];
        let neg: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((spearman(&x, &x) - 1.0).abs() < 1e-9);
        assert!((spearman(&x, &neg) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gaussian_cdf_known_points() {
        assert!((gaussian_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((gaussian_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((gaussian_cdf(-1.96) - 0.025).abs() < 1e-3);
        assert!(gaussian_cdf(-50.0) < 1e-6);
        assert!(gaussian_cdf(50.0) > 1.0 - 1e-6);
    }

    #[test]
    fn test_gaussian_inv_cdf_roundtrip() {
        for p in [0.05, 0.25, 0.5, 0.75, 0.95] {
            let x = gaussian_inv_cdf(p);
            assert!((gaussian_cdf(x) - p).abs() < 1e-6);
        }
    }

    #[test]
    fn test_downside_deviation_all_positive() {
        let returns = vec![0.01, 0.02, 0.03];
        assert_eq!(downside_deviation(&returns, 0.0), 0.0);
    }

    #[test]
    fn test_downside_deviation_mixed_returns_only_penalizes_shortfall() {
        // min(r - target, 0)^2 only accumulates over the two returns below
        // target (0.0); the positive return contributes zero. Denominator
        // is the full count (3), not just the two negative observations.
        let returns = vec![-0.02, 0.01, -0.04];
        let expected = (((-0.02_f64).powi(2) + 0.0 + (-0.04_f64).powi(2)) / 3.0).sqrt();
        assert!((downside_deviation(&returns, 0.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_downside_deviation_uses_full_n_not_count_of_negatives() {
        // One shortfall among four observations: dividing by the full
        // count of 4 (not the 1 negative observation) is the documented
        // convention spec.md fixes, and distinguishes this from the
        // "divide by count of negative observations" textbook variant.
        let returns = vec![0.05, 0.05, 0.05, -0.01];
        let full_n = (((-0.01_f64).powi(2)) / 4.0).sqrt();
        let neg_count_only = (((-0.01_f64).powi(2)) / 1.0).sqrt();
        let actual = downside_deviation(&returns, 0.0);
        assert!((actual - full_n).abs() < 1e-12);
        assert!((actual - neg_count_only).abs() > 1e-6);
    }

    #[test]
    fn test_vif_no_predictors() {
        let y = vec![1.0, 2.0, 3.0];
        assert_eq!(vif(&y, &[]), None);
    }

    #[test]
    fn test_vif_perfect_collinearity() {
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let x = y.clone();
        let predictors: Vec<&[f64]> = vec![&x];
        assert_eq!(vif(&y, &predictors), Some(f64::INFINITY));
    }

    #[test]
    fn test_strategy_returns_follows_signal_sign() {
        let signals = vec![1.0, -1.0, 0.0, 2.5, -0.3];
        let returns = vec![0.01, 0.01, 0.01, -0.02, 0.02];
        let out = strategy_returns(&signals, &returns);
        assert_eq!(out, vec![0.01, -0.01, 0.0, -0.02, -0.02]);
    }

    #[test]
    fn test_vif_unrelated_predictor() {
        let y = vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let x = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let predictors: Vec<&[f64]> = vec![&x];
        let v = vif(&y, &predictors).unwrap();
        assert!(v.is_finite());
        assert!(v >= 1.0);
    }
}
