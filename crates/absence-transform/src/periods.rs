//! Period Tagger and month index.
//!
//! Both regression specifications tag their input through [`tag_periods`];
//! the era boundaries come from [`PeriodBoundaries`] alone.

use absence_model::columns::{MONTH, MONTH_ID, YEAR};
use absence_model::{Period, PeriodBoundaries, Result};
use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::debug;

use crate::frame::{int_values, require_columns};

/// Add the `P1`, `P2`, `P3` era indicators derived from `YEAR`.
///
/// Exactly one indicator is 1 for any year at or after `p1_start`; earlier
/// or null years get all zeros.
pub fn tag_periods(df: &DataFrame, boundaries: &PeriodBoundaries) -> Result<DataFrame> {
    require_columns(df, &[YEAR], "tag_periods")?;
    let years = int_values(df, YEAR)?;
    let mut out = df.clone();
    for period in Period::ALL {
        let indicator: Vec<i64> = years
            .iter()
            .map(|&year| i64::from(era_of(year, boundaries) == Some(period)))
            .collect();
        out.with_column(Series::new(period.column_name().into(), indicator))?;
    }
    let untagged = years
        .iter()
        .filter(|&&year| era_of(year, boundaries).is_none())
        .count();
    debug!(rows = out.height(), untagged, "periods tagged");
    Ok(out)
}

/// `[P1, P2, P3]` indicator values for a single year.
pub fn period_indicators(year: Option<i64>, boundaries: &PeriodBoundaries) -> [i64; 3] {
    let era = era_of(year, boundaries);
    Period::ALL.map(|period| i64::from(era == Some(period)))
}

fn era_of(year: Option<i64>, boundaries: &PeriodBoundaries) -> Option<Period> {
    year.and_then(|year| boundaries.classify(year))
}

/// Add `month_id = YEAR * 12 + MONTH`; null when either part is null or the
/// index would overflow.
pub fn add_month_index(df: &DataFrame) -> Result<DataFrame> {
    require_columns(df, &[YEAR, MONTH], "add_month_index")?;
    let years = int_values(df, YEAR)?;
    let months = int_values(df, MONTH)?;
    let index: Vec<Option<i64>> = years
        .iter()
        .zip(&months)
        .map(|(&year, &month)| year?.checked_mul(12)?.checked_add(month?))
        .collect();
    let mut out = df.clone();
    out.with_column(Series::new(MONTH_ID.into(), index))?;
    Ok(out)
}
