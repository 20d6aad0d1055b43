use std::path::PathBuf;

use absence_did::DidReport;
use absence_transform::RateCoverage;

#[derive(Debug)]
pub struct RatesOutcome {
    pub input_rows: usize,
    pub rate_rows: usize,
    pub coverage: RateCoverage,
    pub min_months: usize,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct DidOutcome {
    pub report: DidReport,
    /// Model output written as JSON, when requested.
    pub json: Option<PathBuf>,
    /// The GLM was requested, so its failure counts as an error.
    pub glm_requested: bool,
}

impl DidOutcome {
    pub fn has_errors(&self) -> bool {
        self.report.group_rate.is_err()
            || (self.glm_requested
                && !matches!(self.report.person_month, Some(Ok(_))))
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub rates: RatesOutcome,
    pub gap: PathBuf,
    pub did: DidOutcome,
    pub summary: PathBuf,
}
