//! Significance tests
//!
//! - One-sample Student t-test (two-sided)
//! - Wilcoxon signed-rank test (two-sided), exact for small tie-free samples and
//!   normal-approximated otherwise

use super::descriptive::{mean, sample_std_dev};
use super::distribution::{normal_two_sided_p, student_t_two_sided_p};
use crate::error::EvaluationError;

/// Largest number of non-zero differences for which the exact signed-rank
/// distribution is used (when there are no ties)
pub const EXACT_SIGNED_RANK_MAX_N: usize = 50;

/// Outcome of a one-sample t-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestResult {
    /// t statistic
    pub statistic: f64,
    /// Degrees of freedom (n - 1)
    pub df: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Sample mean
    pub mean: f64,
    /// Sample size
    pub n: usize,
}

/// One-sample two-sided t-test of `samples` against `population_mean`
///
/// A sample with zero variance gives an infinite statistic (p = 0) when its mean
/// differs from `population_mean`, and NaN statistic and p-value when it does not.
///
/// # Errors
///
/// Returns `EvaluationError::InsufficientSample` for fewer than two samples.
///
/// # Example
///
/// ```
/// use nutrition_eval::stats::hypothesis::one_sample_t_test;
///
/// let result = one_sample_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.0)?;
/// assert_eq!(result.df, 4.0);
/// assert!(result.p_value < 0.05);
/// # Ok::<(), nutrition_eval::EvaluationError>(())
/// ```
pub fn one_sample_t_test(
    samples: &[f64],
    population_mean: f64,
) -> Result<TTestResult, EvaluationError> {
    if samples.len() < 2 {
        return Err(EvaluationError::InsufficientSample {
            required: 2,
            found: samples.len(),
        });
    }

    let n = samples.len();
    let sample_mean = mean(samples);
    let standard_error = sample_std_dev(samples) / (n as f64).sqrt();
    let statistic = (sample_mean - population_mean) / standard_error;
    let df = (n - 1) as f64;

    Ok(TTestResult {
        statistic,
        df,
        p_value: student_t_two_sided_p(statistic, df),
        mean: sample_mean,
        n,
    })
}

/// How the signed-rank p-value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedRankMethod {
    /// Exact null distribution of the rank sum
    Exact,
    /// Normal approximation with tie correction
    NormalApproximation,
}

/// Outcome of a Wilcoxon signed-rank test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignedRankResult {
    /// min(W+, W-)
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Number of non-zero differences that were ranked
    pub n_ranked: usize,
    /// Distribution used for the p-value
    pub method: SignedRankMethod,
}

/// Wilcoxon signed-rank test of paired differences against a zero median
///
/// Zero differences are discarded before ranking; tied magnitudes share their average
/// rank. The exact distribution is used over the remaining differences when they are
/// tie-free and at most [`EXACT_SIGNED_RANK_MAX_N`], even if zeros were discarded. If every
/// difference is zero, or any is NaN, the p-value is NaN.
///
/// # Errors
///
/// Returns `EvaluationError::InsufficientSample` for an empty input.
pub fn wilcoxon_signed_rank(differences: &[f64]) -> Result<SignedRankResult, EvaluationError> {
    if differences.is_empty() {
        return Err(EvaluationError::InsufficientSample {
            required: 1,
            found: 0,
        });
    }

    let nonzero: Vec<f64> = differences.iter().copied().filter(|&d| d != 0.0).collect();
    let n = nonzero.len();

    if n == 0 || nonzero.iter().any(|d| d.is_nan()) {
        log::debug!("Signed-rank test undefined for {} differences", differences.len());
        return Ok(SignedRankResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            n_ranked: n,
            method: SignedRankMethod::NormalApproximation,
        });
    }

    let (ranks, tie_correction) = average_ranks(&nonzero);
    let w_plus: f64 = nonzero
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let total = (n * (n + 1)) as f64 / 2.0;
    let w_minus = total - w_plus;
    let statistic = w_plus.min(w_minus);

    if tie_correction == 0.0 && n <= EXACT_SIGNED_RANK_MAX_N {
        let p_value = (2.0 * exact_lower_tail(n, statistic.round() as usize)).min(1.0);
        return Ok(SignedRankResult {
            statistic,
            p_value,
            n_ranked: n,
            method: SignedRankMethod::Exact,
        });
    }

    let nf = n as f64;
    let expected = nf * (nf + 1.0) / 4.0;
    let variance = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_correction / 48.0;
    let z = (statistic - expected) / variance.sqrt();

    Ok(SignedRankResult {
        statistic,
        p_value: normal_two_sided_p(z),
        n_ranked: n,
        method: SignedRankMethod::NormalApproximation,
    })
}

/// Average ranks of |values| (1-based) and the tie term sum(t^3 - t)
fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].abs().total_cmp(&values[b].abs()));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_correction = 0.0;
    let mut start = 0;
    while start < order.len() {
        let magnitude = values[order[start]].abs();
        let mut end = start + 1;
        while end < order.len() && values[order[end]].abs() == magnitude {
            end += 1;
        }
        // Positions start..end share ranks start+1..=end
        let average = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average;
        }
        let t = (end - start) as f64;
        tie_correction += t * t * t - t;
        start = end;
    }
    (ranks, tie_correction)
}

/// P(W <= w) under the null for n tie-free ranks
fn exact_lower_tail(n: usize, w: usize) -> f64 {
    let max_sum = n * (n + 1) / 2;
    // counts[s] = number of rank subsets summing to s
    let mut counts = vec![0.0f64; max_sum + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for s in (k..=max_sum).rev() {
            counts[s] += counts[s - k];
        }
    }
    let favourable: f64 = counts[..=w.min(max_sum)].iter().sum();
    favourable / 2f64.powi(n as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_test_reference() {
        // mean 3, sd sqrt(2.5), se = sqrt(0.5), t = 3 / 0.7071 = 4.2426, df = 4
        let result = one_sample_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.0).unwrap();
        assert!((result.statistic - 4.242_640_687).abs() < 1e-8);
        assert!((result.p_value - 0.013_235_6).abs() < 1e-6);
        assert_eq!(result.n, 5);
    }

    #[test]
    fn test_t_test_insufficient() {
        let err = one_sample_t_test(&[4.0], 0.0).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::InsufficientSample { required: 2, found: 1 }
        ));
    }

    #[test]
    fn test_t_test_zero_variance() {
        let result = one_sample_t_test(&[2.0, 2.0, 2.0], 0.0).unwrap();
        assert_eq!(result.statistic, f64::INFINITY);
        assert_eq!(result.p_value, 0.0);

        let flat = one_sample_t_test(&[0.0, 0.0], 0.0).unwrap();
        assert!(flat.statistic.is_nan());
        assert!(flat.p_value.is_nan());
    }

    #[test]
    fn test_signed_rank_exact_all_positive() {
        let d: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let result = wilcoxon_signed_rank(&d).unwrap();
        assert_eq!(result.method, SignedRankMethod::Exact);
        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 2.0 / 1024.0).abs() < 1e-15);
    }

    #[test]
    fn test_signed_rank_exact_one_negative() {
        // W- = 3; subsets of 1..=10 with sum <= 3: {}, {1}, {2}, {3}, {1,2}
        let d = [1.0, 2.0, -3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let result = wilcoxon_signed_rank(&d).unwrap();
        assert_eq!(result.statistic, 3.0);
        assert!((result.p_value - 10.0 / 1024.0).abs() < 1e-15);

        let flipped: Vec<f64> = d.iter().map(|v| -v).collect();
        assert_eq!(wilcoxon_signed_rank(&flipped).unwrap().p_value, result.p_value);
    }

    #[test]
    fn test_signed_rank_zeros_dropped() {
        let mut d: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        d.extend([0.0, 0.0]);
        let result = wilcoxon_signed_rank(&d).unwrap();
        assert_eq!(result.n_ranked, 10);
        assert_eq!(result.method, SignedRankMethod::Exact);
        assert!((result.p_value - 2.0 / 1024.0).abs() < 1e-15);
    }

    #[test]
    fn test_signed_rank_ties_use_normal_approximation() {
        // Balanced signs: W+ = W- = expected, z = 0
        let result = wilcoxon_signed_rank(&[1.0, 1.0, -1.0, -1.0]).unwrap();
        assert_eq!(result.method, SignedRankMethod::NormalApproximation);
        assert_eq!(result.statistic, 5.0);
        assert!((result.p_value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_signed_rank_degenerate() {
        assert!(wilcoxon_signed_rank(&[]).is_err());
        assert!(wilcoxon_signed_rank(&[0.0, 0.0, 0.0]).unwrap().p_value.is_nan());
        assert!(wilcoxon_signed_rank(&[1.0, f64::NAN]).unwrap().p_value.is_nan());
    }

    #[test]
    fn test_average_ranks() {
        let (ranks, ties) = average_ranks(&[3.0, -1.0, 1.0, 5.0]);
        assert_eq!(ranks, vec![3.0, 1.5, 1.5, 4.0]);
        assert_eq!(ties, 6.0);
    }
}
