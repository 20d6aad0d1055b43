//! Design-matrix construction for the DiD specifications.
//!
//! Columns follow formula naming: `Intercept`, `C(var)[T.level]` for
//! treatment-coded categorical levels (lowest observed level is the
//! reference), plain names for numeric regressors, and `a:b` for products.

use std::collections::BTreeSet;

use absence_model::{Error, Result};
use nalgebra::DMatrix;

pub const INTERCEPT: &str = "Intercept";

/// Relative tolerance on the Gram-matrix spectrum below which a direction is
/// treated as unidentified.
const RANK_TOLERANCE: f64 = 1e-10;

/// Dense row-major design with named columns.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub names: Vec<String>,
    pub x: DMatrix<f64>,
}

impl DesignMatrix {
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    /// Reject designs that cannot identify every coefficient.
    ///
    /// Checks, in order: more parameters than observations, regressors
    /// without variation, and numerical rank deficiency of `X'X`.
    pub fn check_identified(&self, model: &'static str) -> Result<()> {
        let (n, k) = (self.nrows(), self.ncols());
        if n <= k {
            return Err(Error::degenerate(
                model,
                format!("{n} observations for {k} parameters"),
            ));
        }

        let constant: Vec<&str> = self
            .names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() != INTERCEPT)
            .filter(|(j, _)| {
                let column = self.x.column(*j);
                let first = column[0];
                column.iter().all(|&v| v == first)
            })
            .map(|(_, name)| name.as_str())
            .collect();
        if !constant.is_empty() {
            return Err(Error::degenerate(
                model,
                format!("no variation in {}", constant.join(", ")),
            ));
        }

        let gram = self.x.transpose() * &self.x;
        let singular = gram.singular_values();
        let largest = singular.max();
        let rank = singular
            .iter()
            .filter(|&&s| s > largest * RANK_TOLERANCE)
            .count();
        if rank < k {
            return Err(Error::degenerate(
                model,
                format!("design has rank {rank} but {k} columns (collinear regressors)"),
            ));
        }
        Ok(())
    }
}

/// Values at the rows flagged in `keep`; a kept row must be non-null.
pub(crate) fn select<T: Copy>(values: &[Option<T>], keep: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(keep)
        .filter(|(_, keep)| **keep)
        .filter_map(|(value, _)| *value)
        .collect()
}

/// Incremental builder over a fixed number of rows.
#[derive(Debug, Clone)]
pub struct DesignBuilder {
    rows: usize,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl DesignBuilder {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn intercept(self) -> Self {
        let rows = self.rows;
        self.numeric(INTERCEPT, vec![1.0; rows])
    }

    #[must_use]
    pub fn numeric(mut self, name: &str, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.rows);
        self.names.push(name.to_string());
        self.columns.push(values);
        self
    }

    /// Elementwise product of two previously added columns, named `left:right`.
    /// Unknown names leave the builder unchanged.
    #[must_use]
    pub fn interaction(self, left: &str, right: &str) -> Self {
        let product = match (self.column(left), self.column(right)) {
            (Some(a), Some(b)) => a.iter().zip(b).map(|(a, b)| a * b).collect(),
            _ => return self,
        };
        self.numeric(&format!("{left}:{right}"), product)
    }

    /// Treatment-coded dummies for every observed level except the lowest.
    #[must_use]
    pub fn categorical(mut self, name: &str, levels: &[i64]) -> Self {
        debug_assert_eq!(levels.len(), self.rows);
        let observed: BTreeSet<i64> = levels.iter().copied().collect();
        for &level in observed.iter().skip(1) {
            self.names.push(format!("C({name})[T.{level}]"));
            self.columns.push(
                levels
                    .iter()
                    .map(|&v| if v == level { 1.0 } else { 0.0 })
                    .collect(),
            );
        }
        self
    }

    fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn build(self) -> DesignMatrix {
        let k = self.columns.len();
        let x = DMatrix::from_fn(self.rows, k, |i, j| self.columns[j][i]);
        DesignMatrix {
            names: self.names,
            x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_drops_reference_level() {
        let design = DesignBuilder::new(4)
            .intercept()
            .categorical("MONTH", &[3, 1, 2, 3])
            .build();
        assert_eq!(
            design.names,
            vec!["Intercept", "C(MONTH)[T.2]", "C(MONTH)[T.3]"]
        );
        assert_eq!(design.x[(0, 2)], 1.0);
        assert_eq!(design.x[(1, 1)], 0.0);
        assert_eq!(design.x[(2, 1)], 1.0);
    }

    #[test]
    fn interaction_multiplies_columns() {
        let design = DesignBuilder::new(3)
            .numeric("a", vec![1.0, 0.0, 1.0])
            .numeric("b", vec![1.0, 1.0, 0.0])
            .interaction("a", "b")
            .build();
        assert_eq!(design.names[2], "a:b");
        assert_eq!(design.x.column(2).iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn constant_regressor_is_degenerate() {
        let design = DesignBuilder::new(5)
            .intercept()
            .numeric("x", vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .numeric("P3", vec![0.0; 5])
            .build();
        let err = design.check_identified("test").unwrap_err();
        assert!(err.to_string().contains("no variation in P3"));
    }

    #[test]
    fn collinear_regressors_are_degenerate() {
        let design = DesignBuilder::new(5)
            .intercept()
            .numeric("x", vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .numeric("twice_x", vec![2.0, 4.0, 6.0, 8.0, 10.0])
            .build();
        let err = design.check_identified("test").unwrap_err();
        assert!(err.to_string().contains("rank 2"));
    }

    #[test]
    fn too_few_rows_are_degenerate() {
        let design = DesignBuilder::new(2)
            .intercept()
            .numeric("x", vec![1.0, 2.0])
            .build();
        assert!(matches!(
            design.check_identified("test"),
            Err(Error::DegenerateDesign { .. })
        ));
    }
}
