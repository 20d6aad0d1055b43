//! Person-month binomial GLM with logit link, fitted by IRLS.
//!
//! `own_ill_absent ~ is_parent * (P2 + P3) + C(STATEFIP) + C(MONTH) [+ C(cov)...]`
//! with errors clustered by state.

use absence_model::columns::{IS_PARENT, MONTH, OWN_ILL_ABSENT, P2, P3, STATE, YEAR};
use absence_model::{Error, GlmOptions, ModelFit, ModelKind, PeriodBoundaries, Result};
use absence_transform::{flag_values, int_values, require_columns, tag_periods};
use nalgebra::{DMatrix, DVector};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span, trace, warn};

use crate::cluster::{cluster_covariance, standard_errors};
use crate::design::{DesignBuilder, select};
use crate::inference::{Reference, coefficient_table};

pub(crate) const MODEL: &str = "person_month_glm";

/// Fitted probabilities closer than this to 0 or 1 indicate separation.
const BOUNDARY: f64 = 1e-10;
const MIN_WEIGHT: f64 = 1e-12;

/// Converged logistic regression.
#[derive(Debug, Clone)]
pub struct LogitFit {
    pub beta: DVector<f64>,
    pub fitted: DVector<f64>,
    /// `(X'WX)⁻¹` at the solution.
    pub bread: DMatrix<f64>,
    pub deviance: f64,
    pub iterations: usize,
}

fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

fn binomial_deviance(y: &DVector<f64>, mu: &DVector<f64>) -> f64 {
    -2.0 * y
        .iter()
        .zip(mu.iter())
        .map(|(&y, &mu)| {
            let mu = mu.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);
            if y > 0.5 { mu.ln() } else { (1.0 - mu).ln() }
        })
        .sum::<f64>()
}

/// `X'WX` for row weights `w`, accumulated one row at a time.
fn weighted_gram(x: &DMatrix<f64>, w: &DVector<f64>) -> DMatrix<f64> {
    let k = x.ncols();
    let mut gram = DMatrix::zeros(k, k);
    for i in 0..x.nrows() {
        for a in 0..k {
            let xa = x[(i, a)] * w[i];
            // Dummy columns are mostly zero.
            if xa == 0.0 {
                continue;
            }
            for b in a..k {
                gram[(a, b)] += xa * x[(i, b)];
            }
        }
    }
    gram.fill_lower_triangle_with_upper_triangle();
    gram
}

/// Iteratively reweighted least squares for a 0/1 response.
///
/// Converges when the relative deviance change drops below
/// `options.tolerance`.
pub fn fit_logit(
    model: &'static str,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    options: &GlmOptions,
) -> Result<LogitFit> {
    let mut mu = y.map(|v| (v + 0.5) / 2.0);
    let mut eta = mu.map(|m| (m / (1.0 - m)).ln());
    let mut deviance = binomial_deviance(y, &mu);

    for iteration in 1..=options.max_iterations {
        let w = mu.map(|m| (m * (1.0 - m)).max(MIN_WEIGHT));
        let z = DVector::from_fn(y.len(), |i, _| eta[i] + (y[i] - mu[i]) / w[i]);
        let chol = weighted_gram(x, &w)
            .cholesky()
            .ok_or_else(|| Error::degenerate(model, "X'WX is not positive definite"))?;
        let beta = chol.solve(&x.tr_mul(&w.component_mul(&z)));

        eta = x * &beta;
        mu = eta.map(sigmoid);
        let next = binomial_deviance(y, &mu);
        let change = (next - deviance).abs() / (next.abs() + 0.1);
        trace!(iteration, deviance = next, change, "irls step");
        deviance = next;

        if change < options.tolerance {
            let boundary = mu
                .iter()
                .filter(|&&m| m < BOUNDARY || m > 1.0 - BOUNDARY)
                .count();
            if boundary > 0 {
                return Err(Error::degenerate(
                    model,
                    format!(
                        "fitted probabilities numerically 0 or 1 for {boundary} rows (separation)"
                    ),
                ));
            }
            let w = mu.map(|m| (m * (1.0 - m)).max(MIN_WEIGHT));
            let bread = weighted_gram(x, &w)
                .cholesky()
                .ok_or_else(|| Error::degenerate(model, "X'WX is not positive definite"))?
                .inverse();
            return Ok(LogitFit {
                beta,
                fitted: mu,
                bread,
                deviance,
                iterations: iteration,
            });
        }
    }

    Err(Error::NotConverged {
        model,
        iterations: options.max_iterations,
    })
}

/// Fit the person-month specification on flagged microdata.
///
/// Rows whose outcome is not 0/1, or whose parent flag, state, month, or any
/// covariate is null, are dropped and counted.
pub fn fit_person_month_glm(
    micro: &DataFrame,
    periods: &PeriodBoundaries,
    options: &GlmOptions,
) -> Result<ModelFit> {
    let span = info_span!("person_month_glm", rows = micro.height());
    let _guard = span.enter();

    let mut required = vec![OWN_ILL_ABSENT, IS_PARENT, YEAR, MONTH, STATE];
    required.extend(options.covariates.iter().map(String::as_str));
    require_columns(micro, &required, MODEL)?;
    let tagged = tag_periods(micro, periods)?;

    let outcome: Vec<Option<i64>> = int_values(&tagged, OWN_ILL_ABSENT)?
        .into_iter()
        .map(|v| v.filter(|v| *v == 0 || *v == 1))
        .collect();
    let parent = int_values(&tagged, IS_PARENT)?;
    let state = int_values(&tagged, STATE)?;
    let month = int_values(&tagged, MONTH)?;
    let year = int_values(&tagged, YEAR)?;
    let covariates = options
        .covariates
        .iter()
        .map(|name| int_values(&tagged, name))
        .collect::<Result<Vec<_>>>()?;
    let p2 = flag_values(&tagged, P2)?;
    let p3 = flag_values(&tagged, P3)?;

    let keep: Vec<bool> = (0..tagged.height())
        .map(|i| {
            outcome[i].is_some()
                && parent[i].is_some()
                && state[i].is_some()
                && month[i].is_some()
                && year[i].is_some()
                && covariates.iter().all(|c| c[i].is_some())
        })
        .collect();
    let dropped_rows = keep.iter().filter(|k| !**k).count();
    if dropped_rows > 0 {
        warn!(dropped_rows, "rows with null model fields dropped");
    }

    let as_flag = |v: i64| f64::from(u8::from(v > 0));
    let y = DVector::from_iterator(
        keep.iter().filter(|k| **k).count(),
        select(&outcome, &keep).into_iter().map(|v| v as f64),
    );
    let n = y.len();
    let clusters = select(&state, &keep);
    let kept_flag = |flags: &[i64]| -> Vec<f64> {
        flags
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(&v, _)| as_flag(v))
            .collect()
    };

    let mut builder = DesignBuilder::new(n)
        .intercept()
        .categorical(STATE, &clusters)
        .categorical(MONTH, &select(&month, &keep));
    for (name, values) in options.covariates.iter().zip(&covariates) {
        builder = builder.categorical(name, &select(values, &keep));
    }
    let design = builder
        .numeric(
            IS_PARENT,
            select(&parent, &keep).into_iter().map(as_flag).collect(),
        )
        .numeric(P2, kept_flag(&p2))
        .numeric(P3, kept_flag(&p3))
        .interaction(IS_PARENT, P2)
        .interaction(IS_PARENT, P3)
        .build();
    design.check_identified(MODEL)?;
    debug!(n, k = design.ncols(), "design built");

    let fit = fit_logit(MODEL, &design.x, &y, options)?;
    let residuals = &y - &fit.fitted;
    let (covariance, n_clusters) =
        cluster_covariance(MODEL, &design.x, &residuals, &fit.bread, &clusters)?;
    let terms = coefficient_table(
        &design.names,
        fit.beta.as_slice(),
        &standard_errors(&covariance),
        Reference::StandardNormal,
    );

    info!(
        n_obs = n,
        n_clusters,
        deviance = fit.deviance,
        iterations = fit.iterations,
        "person-month GLM fitted"
    );
    Ok(ModelFit {
        model: ModelKind::PersonMonthGlm,
        terms,
        n_obs: n,
        n_clusters,
        cluster_variable: STATE.to_string(),
        dropped_rows,
        r_squared: None,
        deviance: Some(fit.deviance),
        iterations: Some(fit.iterations),
    })
}
