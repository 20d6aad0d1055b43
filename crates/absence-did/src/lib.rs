//! Difference-in-differences estimators for parent own-illness absence.
//!
//! Two specifications share one output contract ([`ModelFit`]):
//!
//! - [`fit_group_rate_ols`]: monthly group rates, month fixed effects,
//!   errors clustered by year-month
//! - [`fit_person_month_glm`]: person-month logit with state and month fixed
//!   effects, errors clustered by state
//!
//! [`ModelFit`]: absence_model::ModelFit

pub mod cluster;
pub mod design;
pub mod estimator;
pub mod glm;
pub mod inference;
pub mod ols;

pub use cluster::{cluster_covariance, standard_errors};
pub use design::{DesignBuilder, DesignMatrix, INTERCEPT};
pub use estimator::{DidEstimator, DidReport};
pub use glm::{LogitFit, fit_logit, fit_person_month_glm};
pub use inference::{Reference, coefficient_table, pvalue_t, pvalue_z};
pub use ols::{LinearFit, fit_group_rate_ols, least_squares};
