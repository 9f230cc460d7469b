//! Univariate feature selection methods following scikit-learn's API,
//! specialized to binary classification targets.

use ndarray::{Array1, Array2, Axis};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Compute the point-biserial correlation of each feature with a binary target.
///
/// This is Pearson's r for the special case of a 0/1 target and doubles as a
/// signed per-feature association weight: positive values mean the feature is
/// enriched in positive-labelled samples.
///
/// # Parameters
///
/// * `x` - A 2D array of shape (n_samples, n_features).
/// * `y` - Binary labels, one per sample.
/// * `force_finite` - Replace non-finite coefficients (constant features,
///   single-class targets) with 0.0.
///
/// # Returns
///
/// An array of shape (n_features,) with one correlation coefficient per feature.
pub fn point_biserial(x: &Array2<f64>, y: &[bool], force_finite: bool) -> Array1<f64> {
    let n = x.nrows() as f64;
    let n_pos = y.iter().filter(|&&l| l).count() as f64;
    let n_neg = n - n_pos;

    let mut coefficients = Array1::zeros(x.ncols());
    for (j, col) in x.axis_iter(Axis(1)).enumerate() {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut sum_pos = 0.0;
        for (value, &label) in col.iter().zip(y) {
            sum += value;
            sum_sq += value * value;
            if label {
                sum_pos += value;
            }
        }
        let mean_pos = sum_pos / n_pos;
        let mean_neg = (sum - sum_pos) / n_neg;
        let std_dev = (sum_sq / n - (sum / n).powi(2)).max(0.0).sqrt();
        coefficients[j] = (mean_pos - mean_neg) / std_dev * (n_pos * n_neg / (n * n)).sqrt();
    }

    if force_finite {
        for value in coefficients.iter_mut() {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
    }

    coefficients
}

/// Univariate F-test for each feature against a binary target.
///
/// # Parameters
///
/// * `x` - A 2D array of shape (n_samples, n_features).
/// * `y` - Binary labels, one per sample.
/// * `force_finite` - Clamp infinite F-statistics to `f64::MAX` (p-value 0)
///   and NaN F-statistics to 0 (p-value 1).
///
/// # Returns
///
/// A tuple containing:
/// - An array of shape (n_features,) with F-statistics for each feature.
/// - An array of shape (n_features,) with the associated p-values.
pub fn f_classif(x: &Array2<f64>, y: &[bool], force_finite: bool) -> (Array1<f64>, Array1<f64>) {
    let correlation_coefficient = point_biserial(x, y, force_finite);
    let deg_of_freedom = y.len() as f64 - 2.0;
    if deg_of_freedom < 1.0 {
        return (
            Array1::zeros(x.ncols()),
            Array1::from_elem(x.ncols(), 1.0),
        );
    }

    let corr_coef_squared = correlation_coefficient.mapv(|r| r.powi(2));
    let mut f_statistic = &corr_coef_squared / (1.0 - &corr_coef_squared) * deg_of_freedom;
    let mut p_values = Array1::zeros(f_statistic.len());

    let f_dist = FisherSnedecor::new(1.0, deg_of_freedom).unwrap();
    for (i, &f) in f_statistic.iter().enumerate() {
        p_values[i] = 1.0 - f_dist.cdf(f);
    }

    if force_finite {
        for i in 0..f_statistic.len() {
            if f_statistic[i].is_infinite() {
                f_statistic[i] = f64::MAX;
                p_values[i] = 0.0;
            } else if f_statistic[i].is_nan() {
                f_statistic[i] = 0.0;
                p_values[i] = 1.0;
            }
        }
    }

    (f_statistic, p_values)
}

/// Selects the k best features based on univariate F-scores, similar to
/// scikit-learn's SelectKBest with f_classif as the scoring function.
pub struct SelectKBest {
    /// The number of top features to select.
    k: usize,
}

impl SelectKBest {
    pub fn new(k: usize) -> Self {
        SelectKBest { k }
    }

    /// Fits the selector and returns the indices of the k best features,
    /// highest-scoring first. Requests for more features than exist are
    /// clamped to the feature count; ties are broken by feature index.
    pub fn fit(&self, x: &Array2<f64>, y: &[bool]) -> Vec<usize> {
        let (f_scores, _) = f_classif(x, y, true);

        let mut indices: Vec<usize> = (0..f_scores.len()).collect();
        indices.sort_by(|&i, &j| {
            f_scores[j]
                .partial_cmp(&f_scores[i])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        indices.into_iter().take(self.k).collect()
    }
}
