//! Parent Classifier.

use absence_model::Result;
use absence_model::columns::{
    FATHER_LINK, HAS_CHILD_UNDER5, IS_PARENT, MOTHER_LINK, NUM_CHILDREN, NUM_CHILDREN_UNDER5,
    PARENT_REQUIRED,
};
use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::{info, info_span};

use crate::frame::{int_values, require_columns};

const STAGE: &str = "classify_parents";

/// Add `is_parent` and `has_child_under5` from household-composition fields.
///
/// Null contributing cells count as 0 (no evidence of parenthood).
pub fn classify_parents(df: &DataFrame) -> Result<DataFrame> {
    let span = info_span!("classify_parents", rows = df.height());
    let _guard = span.enter();
    require_columns(df, PARENT_REQUIRED, STAGE)?;

    let children = int_values(df, NUM_CHILDREN)?;
    let under5 = int_values(df, NUM_CHILDREN_UNDER5)?;
    let mothers = int_values(df, MOTHER_LINK)?;
    let fathers = int_values(df, FATHER_LINK)?;

    let is_parent: Vec<i64> = children
        .iter()
        .zip(&mothers)
        .zip(&fathers)
        .map(|((&children, &mother), &father)| parent_flag(children, mother, father))
        .collect();
    let has_child_under5: Vec<i64> = under5
        .iter()
        .map(|&count| i64::from(count.unwrap_or(0) > 0))
        .collect();

    let parents = is_parent.iter().sum::<i64>();
    let mut out = df.clone();
    out.with_column(Series::new(IS_PARENT.into(), is_parent))?;
    out.with_column(Series::new(HAS_CHILD_UNDER5.into(), has_child_under5))?;
    info!(rows = out.height(), parents, "parent flags assigned");
    Ok(out)
}

/// 1 when any co-resident child count or parent link is positive.
pub fn parent_flag(children: Option<i64>, mother: Option<i64>, father: Option<i64>) -> i64 {
    let positive = |value: Option<i64>| value.unwrap_or(0) > 0;
    i64::from(positive(children) || positive(mother) || positive(father))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_positive_field_marks_parent() {
        assert_eq!(parent_flag(Some(1), Some(0), Some(0)), 1);
        assert_eq!(parent_flag(Some(0), Some(3), None), 1);
        assert_eq!(parent_flag(None, None, Some(2)), 1);
        assert_eq!(parent_flag(Some(0), Some(0), Some(0)), 0);
        assert_eq!(parent_flag(None, None, None), 0);
    }
}
