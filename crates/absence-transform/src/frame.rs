//! Schema checks and typed column access over Polars frames.
//!
//! Stages check their required columns once at entry and then read columns
//! as plain `Vec<Option<_>>` values, so cell-level problems become nulls
//! instead of errors.

use absence_model::{Error, Result};
use polars::prelude::{Column, DataFrame, DataType, IntoColumn, NamedFrom, Series};

use crate::numeric::{integral, parse_code};

/// Whether `df` has a column named exactly `name`.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Fail with [`Error::MissingColumn`] for the first absent column.
pub fn require_columns(df: &DataFrame, columns: &[&str], stage: &'static str) -> Result<()> {
    match columns.iter().find(|name| !has_column(df, name)) {
        Some(missing) => Err(Error::missing_column(stage, *missing)),
        None => Ok(()),
    }
}

/// Read a column as nullable integer codes.
///
/// Strings are parsed leniently, floats must be integral, and any dtype that
/// cannot be cast becomes all-null.
pub fn int_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name)?;
    let values = match column.dtype() {
        DataType::Int64 => column.i64()?.into_iter().collect(),
        DataType::String => column
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_code))
            .collect(),
        DataType::Boolean => column
            .bool()?
            .into_iter()
            .map(|value| value.map(i64::from))
            .collect(),
        _ => match column.cast(&DataType::Float64) {
            Ok(cast) => cast
                .f64()?
                .into_iter()
                .map(|value| value.and_then(integral))
                .collect(),
            Err(_) => vec![None; df.height()],
        },
    };
    Ok(values)
}

/// Read a column as nullable floats; non-finite values become null.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let values = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|value| value.and_then(|v| v.trim().parse::<f64>().ok()))
            .map(|value| value.filter(|v| v.is_finite()))
            .collect(),
        _ => match column.cast(&DataType::Float64) {
            Ok(cast) => cast
                .f64()?
                .into_iter()
                .map(|value| value.filter(|v| v.is_finite()))
                .collect(),
            Err(_) => vec![None; df.height()],
        },
    };
    Ok(values)
}

/// Read a 0/1 flag column; null or non-positive means 0.
pub fn flag_values(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    Ok(int_values(df, name)?
        .into_iter()
        .map(|value| i64::from(value.unwrap_or(0) > 0))
        .collect())
}

/// Narrow copy of `df` with `ints` read as nullable `Int64` codes and
/// `floats` as nullable `Float64` values, in that column order.
///
/// Expression pipelines run over this frame so that lenient parsing happens
/// once, before any grouping or joining.
pub fn typed_frame(df: &DataFrame, ints: &[&str], floats: &[&str]) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(ints.len() + floats.len());
    for name in ints {
        columns.push(Series::new((*name).into(), int_values(df, name)?).into_column());
    }
    for name in floats {
        columns.push(Series::new((*name).into(), float_values(df, name)?).into_column());
    }
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: Vec<Series>) -> DataFrame {
        DataFrame::new(columns.into_iter().map(IntoColumn::into_column).collect()).unwrap()
    }

    #[test]
    fn require_columns_names_first_missing() {
        let df = frame(vec![Series::new("YEAR".into(), vec![2000i64])]);
        let err = require_columns(&df, &["YEAR", "MONTH", "AGE"], "test").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column, .. } if column == "MONTH"));
    }

    #[test]
    fn int_values_coerce_strings() {
        let df = frame(vec![Series::new(
            "AGE".into(),
            vec![Some("30"), Some(" 41 "), Some("x"), None, Some("25.0")],
        )]);
        assert_eq!(
            int_values(&df, "AGE").unwrap(),
            vec![Some(30), Some(41), None, None, Some(25)]
        );
    }

    #[test]
    fn int_values_reject_fractional_floats() {
        let df = frame(vec![Series::new(
            "AGE".into(),
            vec![Some(30.0f64), Some(30.5), None],
        )]);
        assert_eq!(int_values(&df, "AGE").unwrap(), vec![Some(30), None, None]);
    }

    #[test]
    fn int_values_widen_small_ints() {
        let df = frame(vec![Series::new("SEX".into(), vec![Some(1i32), None, Some(2)])]);
        assert_eq!(int_values(&df, "SEX").unwrap(), vec![Some(1), None, Some(2)]);
    }

    #[test]
    fn flag_values_treat_null_as_zero() {
        let df = frame(vec![Series::new("NCHILD".into(), vec![Some(2i64), None, Some(0)])]);
        assert_eq!(flag_values(&df, "NCHILD").unwrap(), vec![1, 0, 0]);
    }

    #[test]
    fn typed_frame_coerces_once() {
        let df = frame(vec![
            Series::new("YEAR".into(), vec!["2010", "x"]),
            Series::new("rate".into(), vec!["0.25", "inf"]),
            Series::new("AGE".into(), vec!["30", "31"]),
        ]);
        let typed = typed_frame(&df, &["YEAR"], &["rate"]).unwrap();
        assert_eq!(typed.get_column_names_str(), vec!["YEAR", "rate"]);
        assert_eq!(typed.column("YEAR").unwrap().dtype(), &DataType::Int64);
        let rates: Vec<Option<f64>> =
            typed.column("rate").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(rates, vec![Some(0.25), None]);
    }
}
