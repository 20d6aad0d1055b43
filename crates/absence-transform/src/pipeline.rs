//! Stage composition: raw records to flagged records to monthly rates.

use std::time::Instant;

use absence_model::{Codebook, Result};
use polars::prelude::DataFrame;
use tracing::info;

use crate::parent::classify_parents;
use crate::rates::aggregate_monthly_rates;
use crate::recode::recode;

/// Recode raw records and attach the parent flags.
pub fn prepare_microdata(raw: &DataFrame, codebook: &Codebook) -> Result<DataFrame> {
    let recoded = recode(raw, codebook)?;
    classify_parents(&recoded)
}

/// Run the recoder, parent classifier, and monthly rate aggregation.
pub fn build_rates(raw: &DataFrame, codebook: &Codebook) -> Result<DataFrame> {
    let start = Instant::now();
    let flagged = prepare_microdata(raw, codebook)?;
    let rates = aggregate_monthly_rates(&flagged, &codebook.eligibility)?;
    info!(
        input_rows = raw.height(),
        rate_rows = rates.height(),
        duration_ms = start.elapsed().as_millis(),
        "rate table built"
    );
    Ok(rates)
}
