//! Table transforms for the own-illness absence pipeline.
//!
//! Each stage takes a Polars [`DataFrame`](polars::prelude::DataFrame) and
//! returns a new one:
//!
//! - **recode**: nullable integer codes and the `own_ill_absent` flag
//! - **parent**: `is_parent` and `has_child_under5`
//! - **rates**: eligible-population monthly rates, gap series, coverage
//! - **periods**: `P1`/`P2`/`P3` era indicators and the month index
//! - **pipeline**: the stages above chained for a raw extract

pub mod frame;
pub mod numeric;
pub mod parent;
pub mod periods;
pub mod pipeline;
pub mod rates;
pub mod recode;

pub use frame::{
    float_values, flag_values, has_column, int_values, require_columns, typed_frame,
};
pub use parent::{classify_parents, parent_flag};
pub use periods::{add_month_index, period_indicators, tag_periods};
pub use pipeline::{build_rates, prepare_microdata};
pub use rates::{
    MONTHLY_KEYS, RateCoverage, aggregate_monthly_rates, aggregate_rates, eligible_rows,
    parent_gap, rate_coverage,
};
pub use recode::{own_ill_flag, recode};
