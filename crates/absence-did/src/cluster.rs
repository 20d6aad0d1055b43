//! Liang–Zeger cluster-robust covariance.

use std::collections::BTreeMap;

use absence_model::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Sandwich covariance `c · B⁻¹ M B⁻¹` with per-cluster score sums.
///
/// `working_residuals` are `y - ŷ` for OLS and `y - μ` for the logit; `bread`
/// is the inverse of `X'X` or `X'WX` respectively. The finite-sample factor is
/// `c = G/(G-1) · (N-1)/(N-K)`.
pub fn cluster_covariance(
    model: &'static str,
    x: &DMatrix<f64>,
    working_residuals: &DVector<f64>,
    bread: &DMatrix<f64>,
    clusters: &[i64],
) -> Result<(DMatrix<f64>, usize)> {
    let (n, k) = (x.nrows(), x.ncols());

    let mut scores: BTreeMap<i64, DVector<f64>> = BTreeMap::new();
    for (i, &cluster) in clusters.iter().enumerate() {
        let score = scores
            .entry(cluster)
            .or_insert_with(|| DVector::zeros(k));
        let e = working_residuals[i];
        for j in 0..k {
            score[j] += x[(i, j)] * e;
        }
    }

    let g = scores.len();
    if g < 2 {
        return Err(Error::degenerate(
            model,
            format!("{g} cluster(s); clustered errors need at least 2"),
        ));
    }

    let mut meat = DMatrix::zeros(k, k);
    for score in scores.values() {
        meat += score * score.transpose();
    }

    let (g_f, n_f, k_f) = (g as f64, n as f64, k as f64);
    let correction = (g_f / (g_f - 1.0)) * ((n_f - 1.0) / (n_f - k_f));
    let covariance = bread * meat * bread * correction;
    Ok((covariance, g))
}

/// Square roots of the covariance diagonal, floored at zero.
pub fn standard_errors(covariance: &DMatrix<f64>) -> Vec<f64> {
    covariance
        .diagonal()
        .iter()
        .map(|v| v.max(0.0).sqrt())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cluster_is_rejected() {
        let x = DMatrix::from_element(4, 1, 1.0);
        let e = DVector::from_vec(vec![0.1, -0.1, 0.2, -0.2]);
        let bread = DMatrix::from_element(1, 1, 0.25);
        let err = cluster_covariance("test", &x, &e, &bread, &[7, 7, 7, 7]).unwrap_err();
        assert!(matches!(err, Error::DegenerateDesign { .. }));
    }

    #[test]
    fn intercept_only_matches_closed_form() {
        // Mean model: each cluster score is the cluster residual sum.
        let x = DMatrix::from_element(4, 1, 1.0);
        let e = DVector::from_vec(vec![1.0, 1.0, -1.0, -1.0]);
        let bread = DMatrix::from_element(1, 1, 0.25);
        let (cov, g) = cluster_covariance("test", &x, &e, &bread, &[1, 1, 2, 2]).unwrap();
        assert_eq!(g, 2);
        // meat = 2^2 + (-2)^2 = 8; c = 2 * 3/3 = 2; var = 2 * 8 / 16 = 1.
        assert!((cov[(0, 0)] - 1.0).abs() < 1e-12);
        assert_eq!(standard_errors(&cov), vec![1.0]);
    }
}
