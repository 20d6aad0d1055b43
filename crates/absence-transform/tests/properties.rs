//! Property tests over generated person-month records.

use absence_model::{Codebook, Eligibility, PeriodBoundaries};
use absence_transform::{aggregate_monthly_rates, prepare_microdata, tag_periods};
use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};
use proptest::prelude::{Strategy, prop_assert, prop_assert_eq, proptest};

#[derive(Debug, Clone)]
struct Record {
    year: i64,
    month: i64,
    age: Option<i64>,
    empstat: Option<i64>,
    absent: Option<i64>,
    reason: Option<i64>,
    nchild: Option<i64>,
    nchlt5: Option<i64>,
    momloc: Option<i64>,
    poploc: Option<i64>,
}

fn record() -> impl Strategy<Value = Record> {
    let small = || proptest::option::of(0i64..4);
    (
        (1994i64..2030, 1i64..=12, proptest::option::of(15i64..70)),
        (
            proptest::option::of(proptest::sample::select(vec![10i64, 12, 21, 36])),
            proptest::option::of(0i64..3),
            proptest::option::of(proptest::sample::select(vec![0i64, 5, 10, 11, 99])),
        ),
        (small(), small(), small(), small()),
    )
        .prop_map(
            |((year, month, age), (empstat, absent, reason), (nchild, nchlt5, momloc, poploc))| {
                Record {
                    year,
                    month,
                    age,
                    empstat,
                    absent,
                    reason,
                    nchild,
                    nchlt5,
                    momloc,
                    poploc,
                }
            },
        )
}

fn frame(records: &[Record]) -> DataFrame {
    let col = |name: &str, values: Vec<Option<i64>>| -> Column {
        Series::new(name.into(), values).into_column()
    };
    DataFrame::new(vec![
        col("YEAR", records.iter().map(|r| Some(r.year)).collect()),
        col("MONTH", records.iter().map(|r| Some(r.month)).collect()),
        col("AGE", records.iter().map(|r| r.age).collect()),
        col("EMPSTAT", records.iter().map(|r| r.empstat).collect()),
        col("ABSENT", records.iter().map(|r| r.absent).collect()),
        col("WHYABSNT", records.iter().map(|r| r.reason).collect()),
        col("NCHILD", records.iter().map(|r| r.nchild).collect()),
        col("NCHLT5", records.iter().map(|r| r.nchlt5).collect()),
        col("MOMLOC", records.iter().map(|r| r.momloc).collect()),
        col("POPLOC", records.iter().map(|r| r.poploc).collect()),
    ])
    .unwrap()
}

fn flags(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name)
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

proptest! {
    #[test]
    fn own_ill_absent_is_binary_and_requires_absence(
        records in proptest::collection::vec(record(), 1..60)
    ) {
        let flagged = prepare_microdata(&frame(&records), &Codebook::default()).unwrap();
        for (flag, record) in flags(&flagged, "own_ill_absent").iter().zip(&records) {
            prop_assert!(*flag == 0 || *flag == 1);
            if *flag == 1 {
                prop_assert_eq!(record.absent, Some(1));
            }
        }
    }

    #[test]
    fn children_always_make_a_parent(
        records in proptest::collection::vec(record(), 1..60)
    ) {
        let flagged = prepare_microdata(&frame(&records), &Codebook::default()).unwrap();
        for (flag, record) in flags(&flagged, "is_parent").iter().zip(&records) {
            if record.nchild.unwrap_or(0) > 0 {
                prop_assert_eq!(*flag, 1);
            }
        }
    }

    #[test]
    fn rates_stay_in_unit_interval_and_groups_are_nonempty(
        records in proptest::collection::vec(record(), 1..80)
    ) {
        let flagged = prepare_microdata(&frame(&records), &Codebook::default()).unwrap();
        let rates = aggregate_monthly_rates(&flagged, &Eligibility::default()).unwrap();
        let values = rates.column("rate").unwrap().f64().unwrap();
        for value in values.into_iter() {
            let value = value.unwrap();
            prop_assert!((0.0..=1.0).contains(&value));
        }
        let counts = rates.column("n_obs").unwrap().u32().unwrap();
        for count in counts.into_iter() {
            prop_assert!(count.unwrap() > 0);
        }
    }

    #[test]
    fn exactly_one_period_from_1994(year in 1994i64..2200) {
        let df = DataFrame::new(vec![
            Series::new("YEAR".into(), vec![year]).into_column(),
        ])
        .unwrap();
        let tagged = tag_periods(&df, &PeriodBoundaries::default()).unwrap();
        let total: i64 = ["P1", "P2", "P3"]
            .iter()
            .map(|name| flags(&tagged, name)[0])
            .sum();
        prop_assert_eq!(total, 1);
    }
}
