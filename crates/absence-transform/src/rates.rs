//! Rate Aggregator, parent gap series, and coverage summary.
//!
//! Groups with no eligible observation are absent from the output rather than
//! filled with zero or NaN, so consumers must tolerate sparse month coverage.

use std::collections::BTreeSet;

use absence_model::columns::{
    AGE, EMPLOYMENT_STATUS, GAP, IS_PARENT, MONTH, N_OBS, NON_PARENT_RATE, OWN_ILL_ABSENT,
    PARENT_RATE, RATE, YEAR,
};
use absence_model::{Eligibility, Result};
use polars::prelude::{
    BooleanChunked, DataFrame, Expr, IntoLazy, JoinArgs, JoinType, NamedFrom,
    SortMultipleOptions, col, len, lit,
};
use tracing::{debug, info, info_span, warn};

use crate::frame::{int_values, require_columns, typed_frame};

const STAGE: &str = "aggregate_rates";

/// Keys of the monthly rate table.
pub const MONTHLY_KEYS: [&str; 3] = [YEAR, MONTH, IS_PARENT];

/// Mean own-illness absence per (YEAR, MONTH, is_parent) among eligible workers.
pub fn aggregate_monthly_rates(df: &DataFrame, eligibility: &Eligibility) -> Result<DataFrame> {
    aggregate_rates(df, &MONTHLY_KEYS, Some(eligibility))
}

/// Row mask of workers admitted by `eligibility`.
fn eligibility_mask(df: &DataFrame, eligibility: &Eligibility) -> Result<Vec<bool>> {
    let status = int_values(df, EMPLOYMENT_STATUS)?;
    let ages = int_values(df, AGE)?;
    Ok(status
        .iter()
        .zip(&ages)
        .map(|(&status, &age)| eligibility.admits(status, age))
        .collect())
}

/// Keep only the rows of eligible workers, the population behind the rates.
pub fn eligible_rows(df: &DataFrame, eligibility: &Eligibility) -> Result<DataFrame> {
    require_columns(df, &[EMPLOYMENT_STATUS, AGE], "eligible_rows")?;
    let mask = BooleanChunked::new("eligible".into(), eligibility_mask(df, eligibility)?);
    let out = df.filter(&mask)?;
    debug!(rows = df.height(), kept = out.height(), "eligibility filter applied");
    Ok(out)
}

/// Mean of `own_ill_absent` per combination of integer `keys`.
///
/// With an eligibility filter, rows must have an admitted `EMPSTAT` and an
/// `AGE` in range. Rows with a null key are dropped. Outcome values that are
/// null or outside `[0, 1]` are skipped, so every `rate` lies in `[0, 1]`.
/// Output is sorted ascending by the keys and carries an `n_obs` count.
pub fn aggregate_rates(
    df: &DataFrame,
    keys: &[&str],
    eligibility: Option<&Eligibility>,
) -> Result<DataFrame> {
    let span = info_span!("aggregate_rates", rows = df.height(), keys = ?keys);
    let _guard = span.enter();
    require_columns(df, keys, STAGE)?;
    require_columns(df, &[OWN_ILL_ABSENT], STAGE)?;
    if eligibility.is_some() {
        require_columns(df, &[EMPLOYMENT_STATUS, AGE], STAGE)?;
    }

    let mut typed = typed_frame(df, keys, &[OWN_ILL_ABSENT])?;
    if let Some(filter) = eligibility {
        let mask = BooleanChunked::new("eligible".into(), eligibility_mask(df, filter)?);
        typed = typed.filter(&mask)?;
    }
    let eligible_rows = typed.height();

    let usable = keys.iter().fold(
        col(OWN_ILL_ABSENT)
            .gt_eq(lit(0.0))
            .and(col(OWN_ILL_ABSENT).lt_eq(lit(1.0))),
        |predicate, key| predicate.and(col(*key).is_not_null()),
    );
    let typed = typed.lazy().filter(usable).collect()?;
    let skipped = eligible_rows - typed.height();
    if skipped > 0 {
        warn!(skipped, "rows with null keys or out-of-range outcomes skipped");
    }

    let key_exprs: Vec<Expr> = keys.iter().map(|key| col(*key)).collect();
    let out = typed
        .lazy()
        .group_by(key_exprs.clone())
        .agg([
            col(OWN_ILL_ABSENT).mean().alias(RATE),
            len().alias(N_OBS),
        ])
        .sort_by_exprs(key_exprs, SortMultipleOptions::default())
        .collect()?;

    info!(groups = out.height(), eligible_rows, "rates aggregated");
    Ok(out)
}

/// Parent minus non-parent rate per (YEAR, MONTH) where both groups exist.
///
/// Several rows for one side of a month are averaged first.
pub fn parent_gap(rates: &DataFrame) -> Result<DataFrame> {
    require_columns(rates, &[YEAR, MONTH, IS_PARENT, RATE], "parent_gap")?;
    let typed = typed_frame(rates, &[YEAR, MONTH, IS_PARENT], &[RATE])?;
    let month = [col(YEAR), col(MONTH)];
    let side = |in_side: Expr, alias: &str| {
        typed
            .clone()
            .lazy()
            .filter(
                in_side
                    .and(col(YEAR).is_not_null())
                    .and(col(MONTH).is_not_null())
                    .and(col(RATE).is_not_null()),
            )
            .group_by(month.clone())
            .agg([col(RATE).mean().alias(alias)])
    };

    let out = side(col(IS_PARENT).gt(lit(0)), PARENT_RATE)
        .join(
            side(col(IS_PARENT).lt_eq(lit(0)), NON_PARENT_RATE),
            month.clone(),
            month.clone(),
            JoinArgs::new(JoinType::Inner),
        )
        .with_column((col(PARENT_RATE) - col(NON_PARENT_RATE)).alias(GAP))
        .select([
            col(YEAR),
            col(MONTH),
            col(PARENT_RATE),
            col(NON_PARENT_RATE),
            col(GAP),
        ])
        .sort_by_exprs(month, SortMultipleOptions::default())
        .collect()?;
    debug!(months = out.height(), "parent gap computed");
    Ok(out)
}

/// Month and group coverage of a rate table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateCoverage {
    /// Distinct (YEAR, MONTH) pairs present.
    pub months: usize,
    pub first: Option<(i64, i64)>,
    pub last: Option<(i64, i64)>,
    /// Distinct `is_parent` values present.
    pub parent_groups: BTreeSet<i64>,
}

impl RateCoverage {
    pub fn has_both_groups(&self) -> bool {
        self.parent_groups.contains(&0) && self.parent_groups.contains(&1)
    }

    pub fn meets(&self, min_months: usize) -> bool {
        self.months >= min_months && self.has_both_groups()
    }
}

/// Summarize which months and parent groups a rate table covers.
pub fn rate_coverage(rates: &DataFrame) -> Result<RateCoverage> {
    require_columns(rates, &[YEAR, MONTH, IS_PARENT], "rate_coverage")?;
    let years = int_values(rates, YEAR)?;
    let months = int_values(rates, MONTH)?;
    let parents = int_values(rates, IS_PARENT)?;

    let observed: BTreeSet<(i64, i64)> = years
        .iter()
        .zip(&months)
        .filter_map(|(&year, &month)| Some((year?, month?)))
        .collect();
    Ok(RateCoverage {
        months: observed.len(),
        first: observed.first().copied(),
        last: observed.last().copied(),
        parent_groups: parents.into_iter().flatten().collect(),
    })
}
