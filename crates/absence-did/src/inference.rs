//! Two-sided p-values for coefficient tests.

use absence_model::Coefficient;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Reference distribution for Wald statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reference {
    /// Student-t with the given degrees of freedom.
    StudentT(f64),
    StandardNormal,
}

impl Reference {
    pub fn p_value(self, statistic: f64) -> f64 {
        match self {
            Self::StudentT(df) => pvalue_t(statistic, df),
            Self::StandardNormal => pvalue_z(statistic),
        }
    }
}

pub fn pvalue_t(statistic: f64, df: f64) -> f64 {
    if !statistic.is_finite() {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(statistic.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

pub fn pvalue_z(statistic: f64) -> f64 {
    if !statistic.is_finite() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(dist) => (2.0 * dist.sf(statistic.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Assemble the coefficient table from estimates and standard errors.
pub fn coefficient_table(
    names: &[String],
    estimates: &[f64],
    std_errors: &[f64],
    reference: Reference,
) -> Vec<Coefficient> {
    names
        .iter()
        .zip(estimates.iter().zip(std_errors))
        .map(|(term, (&estimate, &std_error))| {
            let statistic = estimate / std_error;
            Coefficient {
                term: term.clone(),
                estimate,
                std_error,
                statistic,
                p_value: reference.p_value(statistic),
            }
        })
        .collect()
}
