//! Injectable codebook configuration.
//!
//! Every fixed code set or boundary used by the pipeline lives here so that
//! alternate survey codebooks can be substituted without touching the stages.
//! [`Codebook::default`] reproduces the IPUMS CPS Basic Monthly coding.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// IPUMS `WHYABSNT` code for own illness, injury, or medical problems.
pub const DEFAULT_OWN_ILLNESS_CODE: i64 = 10;

/// `ABSENT` code marking a worker with a job who was absent.
pub const DEFAULT_ABSENT_CODE: i64 = 1;

/// IPUMS `EMPSTAT` codes for "at work" and "has job, not at work last week".
pub const DEFAULT_EMPLOYMENT_CODES: [i64; 2] = [10, 12];

/// Complete configuration for the recode, aggregation, and estimation stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Codebook {
    /// `ABSENT` values counted as an absence.
    pub absent_codes: BTreeSet<i64>,
    /// Versioned own-illness reason codes.
    pub own_illness: Vec<ReasonCodeRule>,
    pub eligibility: Eligibility,
    pub periods: PeriodBoundaries,
    pub coverage: CoverageOptions,
    pub glm: GlmOptions,
}

impl Default for Codebook {
    fn default() -> Self {
        Self {
            absent_codes: BTreeSet::from([DEFAULT_ABSENT_CODE]),
            own_illness: vec![ReasonCodeRule::unbounded([DEFAULT_OWN_ILLNESS_CODE])],
            eligibility: Eligibility::default(),
            periods: PeriodBoundaries::default(),
            coverage: CoverageOptions::default(),
            glm: GlmOptions::default(),
        }
    }
}

impl Codebook {
    /// Parse and validate a codebook from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let codebook: Self =
            toml::from_str(text).map_err(|e| Error::InvalidCodebook(e.to_string()))?;
        codebook.validate()?;
        Ok(codebook)
    }

    /// Render the codebook as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidCodebook(e.to_string()))
    }

    /// Replace the own-illness rules.
    #[must_use]
    pub fn with_own_illness(mut self, rules: Vec<ReasonCodeRule>) -> Self {
        self.own_illness = rules;
        self
    }

    #[must_use]
    pub fn with_eligibility(mut self, eligibility: Eligibility) -> Self {
        self.eligibility = eligibility;
        self
    }

    #[must_use]
    pub fn with_periods(mut self, periods: PeriodBoundaries) -> Self {
        self.periods = periods;
        self
    }

    /// Own-illness reason codes in force for a survey year.
    ///
    /// A null year only matches a rule with neither bound set.
    pub fn own_illness_codes(&self, year: Option<i64>) -> Option<&BTreeSet<i64>> {
        self.own_illness
            .iter()
            .find(|rule| rule.covers(year))
            .map(|rule| &rule.codes)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.absent_codes.is_empty() {
            return Err(Error::InvalidCodebook(
                "absent_codes must not be empty".to_string(),
            ));
        }
        if self.own_illness.is_empty() {
            return Err(Error::InvalidCodebook(
                "at least one own_illness rule is required".to_string(),
            ));
        }
        for (idx, rule) in self.own_illness.iter().enumerate() {
            if rule.codes.is_empty() {
                return Err(Error::InvalidCodebook(format!(
                    "own_illness rule {idx} has no codes"
                )));
            }
            if let (Some(first), Some(last)) = (rule.first_year, rule.last_year)
                && first > last
            {
                return Err(Error::InvalidCodebook(format!(
                    "own_illness rule {idx} has first_year {first} after last_year {last}"
                )));
            }
            for (other_idx, other) in self.own_illness.iter().enumerate().skip(idx + 1) {
                if rule.overlaps(other) {
                    return Err(Error::InvalidCodebook(format!(
                        "own_illness rules {idx} and {other_idx} cover overlapping years"
                    )));
                }
            }
        }
        if self.eligibility.employment_codes.is_empty() {
            return Err(Error::InvalidCodebook(
                "eligibility.employment_codes must not be empty".to_string(),
            ));
        }
        if self.eligibility.min_age > self.eligibility.max_age {
            return Err(Error::InvalidCodebook(format!(
                "eligibility.min_age {} exceeds max_age {}",
                self.eligibility.min_age, self.eligibility.max_age
            )));
        }
        let PeriodBoundaries {
            p1_start,
            p2_start,
            p3_start,
        } = self.periods;
        if !(p1_start < p2_start && p2_start < p3_start) {
            return Err(Error::InvalidCodebook(format!(
                "period starts must ascend: {p1_start}, {p2_start}, {p3_start}"
            )));
        }
        if self.glm.max_iterations == 0 || !(self.glm.tolerance > 0.0) {
            return Err(Error::InvalidCodebook(
                "glm.max_iterations and glm.tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A set of reason codes valid over an inclusive range of survey years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCodeRule {
    pub codes: BTreeSet<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_year: Option<i64>,
}

impl ReasonCodeRule {
    /// A rule applying to every year.
    pub fn unbounded(codes: impl IntoIterator<Item = i64>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
            first_year: None,
            last_year: None,
        }
    }

    /// A rule applying to `first_year..=last_year`.
    pub fn between(
        codes: impl IntoIterator<Item = i64>,
        first_year: Option<i64>,
        last_year: Option<i64>,
    ) -> Self {
        Self {
            codes: codes.into_iter().collect(),
            first_year,
            last_year,
        }
    }

    fn covers(&self, year: Option<i64>) -> bool {
        match year {
            Some(year) => {
                self.first_year.is_none_or(|first| year >= first)
                    && self.last_year.is_none_or(|last| year <= last)
            }
            None => self.first_year.is_none() && self.last_year.is_none(),
        }
    }

    fn overlaps(&self, other: &Self) -> bool {
        let lo = |rule: &Self| rule.first_year.unwrap_or(i64::MIN);
        let hi = |rule: &Self| rule.last_year.unwrap_or(i64::MAX);
        lo(self) <= hi(other) && lo(other) <= hi(self)
    }
}

/// Subpopulation entering the rate aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub employment_codes: BTreeSet<i64>,
    pub min_age: i64,
    pub max_age: i64,
}

impl Default for Eligibility {
    fn default() -> Self {
        Self {
            employment_codes: DEFAULT_EMPLOYMENT_CODES.into_iter().collect(),
            min_age: 25,
            max_age: 49,
        }
    }
}

impl Eligibility {
    /// Missing employment status or age never qualifies.
    pub fn admits(&self, employment_status: Option<i64>, age: Option<i64>) -> bool {
        let employed = employment_status.is_some_and(|code| self.employment_codes.contains(&code));
        let in_ages = age.is_some_and(|age| (self.min_age..=self.max_age).contains(&age));
        employed && in_ages
    }
}

/// Policy eras used as the DiD time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    P1,
    P2,
    P3,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::P1, Period::P2, Period::P3];

    pub fn column_name(self) -> &'static str {
        match self {
            Self::P1 => crate::columns::P1,
            Self::P2 => crate::columns::P2,
            Self::P3 => crate::columns::P3,
        }
    }
}

/// First year of each era. P1 runs to the year before P2, P2 to the year
/// before P3, and P3 is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBoundaries {
    pub p1_start: i64,
    pub p2_start: i64,
    pub p3_start: i64,
}

impl Default for PeriodBoundaries {
    fn default() -> Self {
        Self {
            p1_start: 1994,
            p2_start: 2008,
            p3_start: 2020,
        }
    }
}

impl PeriodBoundaries {
    /// Era containing `year`, or `None` before the modeled domain.
    pub fn classify(&self, year: i64) -> Option<Period> {
        if year >= self.p3_start {
            Some(Period::P3)
        } else if year >= self.p2_start {
            Some(Period::P2)
        } else if year >= self.p1_start {
            Some(Period::P1)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageOptions {
    /// Fewest distinct survey months expected in a full rate table.
    pub min_months: usize,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        Self { min_months: 300 }
    }
}

/// Person-month GLM settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlmOptions {
    /// Extra categorical controls (e.g. `SEX`, `EDUC`).
    pub covariates: Vec<String>,
    pub max_iterations: usize,
    /// Convergence threshold on the relative deviance change.
    pub tolerance: f64,
}

impl Default for GlmOptions {
    fn default() -> Self {
        Self {
            covariates: Vec::new(),
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}
