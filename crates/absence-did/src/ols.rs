//! Group-rate OLS: `rate ~ is_parent * (P2 + P3) + C(MONTH)`.
//!
//! Each row of the input is one (YEAR, MONTH, is_parent) cell of the rate
//! table. Errors are clustered by the year-month index, so the parent and
//! non-parent cells of the same survey month share a cluster.

use absence_model::columns::{IS_PARENT, MONTH, MONTH_ID, P2, P3, RATE, YEAR};
use absence_model::{Error, ModelFit, ModelKind, PeriodBoundaries, Result};
use absence_transform::{
    add_month_index, flag_values, float_values, int_values, require_columns, tag_periods,
};
use nalgebra::{DMatrix, DVector};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span, warn};

use crate::cluster::{cluster_covariance, standard_errors};
use crate::design::{DesignBuilder, DesignMatrix, select};
use crate::inference::{Reference, coefficient_table};

pub(crate) const MODEL: &str = "group_rate_ols";

/// Least-squares solution with the pieces the sandwich needs.
#[derive(Debug, Clone)]
pub struct LinearFit {
    pub beta: DVector<f64>,
    pub residuals: DVector<f64>,
    /// `(X'X)⁻¹`
    pub bread: DMatrix<f64>,
    pub r_squared: f64,
}

/// Solve the normal equations through a Cholesky factorisation.
pub fn least_squares(model: &'static str, design: &DesignMatrix, y: &DVector<f64>) -> Result<LinearFit> {
    let x = &design.x;
    let xtx = x.transpose() * x;
    let chol = xtx
        .cholesky()
        .ok_or_else(|| Error::degenerate(model, "X'X is not positive definite"))?;
    let beta = chol.solve(&(x.transpose() * y));
    let bread = chol.inverse();
    let residuals = y - x * &beta;

    let mean = y.mean();
    let tss: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let rss = residuals.norm_squared();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };

    Ok(LinearFit {
        beta,
        residuals,
        bread,
        r_squared,
    })
}

/// Fit the group-rate specification on a monthly rate table.
///
/// Rows with a null rate, parent flag, or year-month are dropped and counted
/// in [`ModelFit::dropped_rows`].
pub fn fit_group_rate_ols(rates: &DataFrame, periods: &PeriodBoundaries) -> Result<ModelFit> {
    let span = info_span!("group_rate_ols", rows = rates.height());
    let _guard = span.enter();

    require_columns(rates, &[YEAR, MONTH, IS_PARENT, RATE], MODEL)?;
    let tagged = add_month_index(&tag_periods(rates, periods)?)?;

    let rate = float_values(&tagged, RATE)?;
    let parent = int_values(&tagged, IS_PARENT)?;
    let month = int_values(&tagged, MONTH)?;
    let month_id = int_values(&tagged, MONTH_ID)?;
    let p2 = flag_values(&tagged, P2)?;
    let p3 = flag_values(&tagged, P3)?;

    let keep: Vec<bool> = (0..tagged.height())
        .map(|i| {
            rate[i].is_some() && parent[i].is_some() && month[i].is_some() && month_id[i].is_some()
        })
        .collect();
    let dropped_rows = keep.iter().filter(|k| !**k).count();
    if dropped_rows > 0 {
        warn!(dropped_rows, "rows with null model fields dropped");
    }

    let y = DVector::from_vec(select(&rate, &keep));
    let n = y.len();
    let as_flag = |v: i64| f64::from(u8::from(v > 0));
    let parent: Vec<f64> = select(&parent, &keep).into_iter().map(as_flag).collect();
    let month = select(&month, &keep);
    let clusters = select(&month_id, &keep);
    let kept_flag = |flags: &[i64]| -> Vec<f64> {
        flags
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(&v, _)| as_flag(v))
            .collect()
    };

    let design = DesignBuilder::new(n)
        .intercept()
        .categorical(MONTH, &month)
        .numeric(IS_PARENT, parent)
        .numeric(P2, kept_flag(&p2))
        .numeric(P3, kept_flag(&p3))
        .interaction(IS_PARENT, P2)
        .interaction(IS_PARENT, P3)
        .build();
    design.check_identified(MODEL)?;
    debug!(n, k = design.ncols(), "design built");

    let fit = least_squares(MODEL, &design, &y)?;
    let (covariance, n_clusters) =
        cluster_covariance(MODEL, &design.x, &fit.residuals, &fit.bread, &clusters)?;
    let reference = Reference::StudentT((n_clusters - 1) as f64);
    let terms = coefficient_table(
        &design.names,
        fit.beta.as_slice(),
        &standard_errors(&covariance),
        reference,
    );

    info!(n_obs = n, n_clusters, r_squared = fit.r_squared, "group-rate OLS fitted");
    Ok(ModelFit {
        model: ModelKind::GroupRateOls,
        terms,
        n_obs: n,
        n_clusters,
        cluster_variable: MONTH_ID.to_string(),
        dropped_rows,
        r_squared: Some(fit.r_squared),
        deviance: None,
        iterations: None,
    })
}
