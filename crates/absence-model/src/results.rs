//! Structured regression output.
//!
//! Rendering is left to consumers; these types only carry numbers.

use serde::{Deserialize, Serialize};

/// Name of the parent-by-P2 interaction term.
pub const PARENT_X_P2: &str = "is_parent:P2";
/// Name of the parent-by-P3 interaction term.
pub const PARENT_X_P3: &str = "is_parent:P3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Group-month rate OLS clustered by month index.
    GroupRateOls,
    /// Person-month logistic GLM clustered by state.
    PersonMonthGlm,
}

impl ModelKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::GroupRateOls => "group-rate OLS",
            Self::PersonMonthGlm => "person-month binomial GLM",
        }
    }
}

/// One row of a coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    /// t statistic for OLS, z statistic for the GLM.
    pub statistic: f64,
    pub p_value: f64,
}

/// A fitted DiD specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFit {
    pub model: ModelKind,
    pub terms: Vec<Coefficient>,
    pub n_obs: usize,
    pub n_clusters: usize,
    pub cluster_variable: String,
    /// Rows removed before fitting because a model field was null.
    pub dropped_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_squared: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
}

impl ModelFit {
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.terms.iter().find(|c| c.term == term)
    }

    /// The two interaction coefficients carrying the policy-period effects.
    pub fn did_effects(&self) -> (Option<&Coefficient>, Option<&Coefficient>) {
        (self.coefficient(PARENT_X_P2), self.coefficient(PARENT_X_P3))
    }
}
