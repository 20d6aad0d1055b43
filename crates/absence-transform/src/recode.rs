//! Recoder: typed numeric fields and the own-illness absence flag.

use std::collections::BTreeSet;

use absence_model::columns::{
    ABSENCE_REASON, ABSENT, OWN_ILL_ABSENT, RECODE_REQUIRED, RECODED_FIELDS, YEAR,
};
use absence_model::{Codebook, Result};
use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::{debug, info, info_span};

use crate::frame::{has_column, int_values, require_columns};

const STAGE: &str = "recode";

/// Coerce the raw survey fields to nullable integers and add `own_ill_absent`.
///
/// Returns a new frame with the same row count. Unparseable cells become
/// null; only a missing `YEAR`, `ABSENT`, or `WHYABSNT` column is an error.
/// Running the recoder on its own output yields the same flags.
pub fn recode(raw: &DataFrame, codebook: &Codebook) -> Result<DataFrame> {
    let span = info_span!("recode", rows = raw.height());
    let _guard = span.enter();
    require_columns(raw, RECODE_REQUIRED, STAGE)?;

    let mut out = raw.clone();
    let mut coerced_to_null = 0usize;
    for &name in RECODED_FIELDS {
        if !has_column(&out, name) {
            debug!(column = name, "optional field absent, skipping");
            continue;
        }
        let existing_nulls = out.column(name)?.null_count();
        let values = int_values(&out, name)?;
        let nulls = values.iter().filter(|v| v.is_none()).count();
        coerced_to_null += nulls.saturating_sub(existing_nulls);
        out.with_column(Series::new(name.into(), values))?;
    }

    let years = int_values(&out, YEAR)?;
    let absent = int_values(&out, ABSENT)?;
    let reasons = int_values(&out, ABSENCE_REASON)?;
    let flags: Vec<i64> = years
        .iter()
        .zip(&absent)
        .zip(&reasons)
        .map(|((&year, &absent), &reason)| {
            own_ill_flag(
                absent,
                reason,
                &codebook.absent_codes,
                codebook.own_illness_codes(year),
            )
        })
        .collect();
    let flagged = flags.iter().filter(|&&flag| flag == 1).count();
    out.with_column(Series::new(OWN_ILL_ABSENT.into(), flags))?;

    info!(
        rows = out.height(),
        own_ill_absent = flagged,
        coerced_to_null,
        "recode complete"
    );
    Ok(out)
}

/// 1 iff the worker was absent and the reason is an own-illness code for the
/// survey year. A null reason, or a year no rule covers, yields 0.
pub fn own_ill_flag(
    absent: Option<i64>,
    reason: Option<i64>,
    absent_codes: &BTreeSet<i64>,
    own_illness_codes: Option<&BTreeSet<i64>>,
) -> i64 {
    let was_absent = absent.is_some_and(|code| absent_codes.contains(&code));
    let own_illness = match (reason, own_illness_codes) {
        (Some(reason), Some(codes)) => codes.contains(&reason),
        _ => false,
    };
    i64::from(was_absent && own_illness)
}
