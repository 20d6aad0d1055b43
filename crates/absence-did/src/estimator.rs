//! Entry point running both DiD specifications from one codebook.

use absence_model::{Codebook, GlmOptions, ModelFit, PeriodBoundaries, Result};
use polars::prelude::DataFrame;
use tracing::warn;

use crate::glm::fit_person_month_glm;
use crate::ols::fit_group_rate_ols;

/// Outcome of [`DidEstimator::fit_all`]. Each model fails independently.
#[derive(Debug)]
pub struct DidReport {
    pub group_rate: Result<ModelFit>,
    /// `None` when no microdata was supplied.
    pub person_month: Option<Result<ModelFit>>,
}

impl DidReport {
    /// Successful fits in report order.
    pub fn fits(&self) -> Vec<&ModelFit> {
        let mut fits = Vec::new();
        if let Ok(fit) = &self.group_rate {
            fits.push(fit);
        }
        if let Some(Ok(fit)) = &self.person_month {
            fits.push(fit);
        }
        fits
    }
}

#[derive(Debug, Clone, Default)]
pub struct DidEstimator {
    periods: PeriodBoundaries,
    glm: GlmOptions,
}

impl DidEstimator {
    pub fn new(codebook: &Codebook) -> Self {
        Self {
            periods: codebook.periods,
            glm: codebook.glm.clone(),
        }
    }

    pub fn periods(&self) -> &PeriodBoundaries {
        &self.periods
    }

    /// Group-rate OLS on a `YEAR, MONTH, is_parent, rate` table.
    pub fn group_rate_ols(&self, rates: &DataFrame) -> Result<ModelFit> {
        fit_group_rate_ols(rates, &self.periods)
    }

    /// Person-month logistic GLM on flagged microdata.
    pub fn person_month_glm(&self, micro: &DataFrame) -> Result<ModelFit> {
        fit_person_month_glm(micro, &self.periods, &self.glm)
    }

    /// Run the OLS and, when microdata is available, the GLM.
    pub fn fit_all(&self, rates: &DataFrame, micro: Option<&DataFrame>) -> DidReport {
        let group_rate = self.group_rate_ols(rates);
        if let Err(err) = &group_rate {
            warn!(error = %err, "group-rate OLS failed");
        }
        let person_month = micro.map(|micro| {
            let fit = self.person_month_glm(micro);
            if let Err(err) = &fit {
                warn!(error = %err, "person-month GLM failed");
            }
            fit
        });
        DidReport {
            group_rate,
            person_month,
        }
    }
}
