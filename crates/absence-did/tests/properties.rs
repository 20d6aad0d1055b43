//! Properties of design construction and the cluster sandwich.

use absence_did::{DesignBuilder, cluster_covariance};
use nalgebra::{DMatrix, DVector};
use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

proptest! {
    #[test]
    fn categorical_columns_match_observed_levels(
        levels in proptest::collection::vec(0i64..12, 1..80)
    ) {
        let mut distinct = levels.clone();
        distinct.sort_unstable();
        distinct.dedup();

        let design = DesignBuilder::new(levels.len())
            .categorical("MONTH", &levels)
            .build();
        prop_assert_eq!(design.ncols(), distinct.len() - 1);
        for row in 0..design.nrows() {
            let ones: f64 = design.x.row(row).iter().sum();
            // Reference-level rows have no dummy set; all others exactly one.
            let expected = if levels[row] == distinct[0] { 0.0 } else { 1.0 };
            prop_assert_eq!(ones, expected);
        }
    }

    #[test]
    fn cluster_covariance_is_symmetric_with_nonnegative_diagonal(
        rows in proptest::collection::vec((-1.0f64..1.0, -1.0f64..1.0, 0i64..6), 8..40)
    ) {
        let n = rows.len();
        let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { rows[i].0 });
        let e = DVector::from_fn(n, |i, _| rows[i].1);
        let clusters: Vec<i64> = rows.iter().map(|r| r.2).collect();
        let bread = (x.transpose() * &x)
            .try_inverse()
            .unwrap_or_else(|| DMatrix::identity(2, 2));

        let distinct = {
            let mut c = clusters.clone();
            c.sort_unstable();
            c.dedup();
            c.len()
        };
        match cluster_covariance("test", &x, &e, &bread, &clusters) {
            Ok((cov, g)) => {
                prop_assert_eq!(g, distinct);
                prop_assert!((cov[(0, 1)] - cov[(1, 0)]).abs() < 1e-9);
                prop_assert!(cov[(0, 0)] >= -1e-12);
                prop_assert!(cov[(1, 1)] >= -1e-12);
            }
            Err(_) => prop_assert!(distinct < 2),
        }
    }
}
