//! File round trips through the CLI commands.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use absence_cli::commands::{
    DID_JSON_FILE, DID_SUMMARY_FILE, GAP_FILE, RATES_FILE, load_codebook, run_did, run_pipeline,
    run_rates,
};
use absence_cli::io::read_table;
use absence_model::Codebook;
use tempfile::TempDir;

const HEADER: &str = "YEAR,MONTH,STATEFIP,AGE,EMPSTAT,ABSENT,WHYABSNT,NCHILD,NCHLT5,MOMLOC,POPLOC";

/// Four eligible workers per month from 2005 to 2022, two of them parents,
/// plus one out-of-range worker who must not reach the rates.
fn write_extract(path: &Path) {
    let mut csv = format!("{HEADER}\n");
    for year in 2005..=2022 {
        for month in 1..=12 {
            for person in 0..4 {
                let state = if person % 2 == 0 { 1 } else { 6 };
                let parent = person < 2;
                let stamp = year * 12 + month + person * 3;
                let (absent, reason) = match stamp % 5 {
                    0 => (1, "10"),
                    1 => (1, "11"),
                    _ => (2, ""),
                };
                writeln!(
                    csv,
                    "{year},{month},{state},{age},10,{absent},{reason},{nchild},0,0,0",
                    age = 30 + person,
                    nchild = u8::from(parent),
                )
                .unwrap();
            }
            writeln!(csv, "{year},{month},1,70,10,1,10,0,0,0,0").unwrap();
        }
    }
    fs::write(path, csv).unwrap();
}

#[test]
fn rates_command_writes_monthly_table() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cps.csv");
    let output = dir.path().join("out").join("rates.csv");
    write_extract(&input);

    let outcome = run_rates(&input, &output, &Codebook::default()).unwrap();
    assert_eq!(outcome.input_rows, 18 * 12 * 5);
    assert_eq!(outcome.rate_rows, 18 * 12 * 2);
    assert_eq!(outcome.coverage.months, 18 * 12);
    assert_eq!(outcome.coverage.first, Some((2005, 1)));
    assert_eq!(outcome.coverage.last, Some((2022, 12)));
    assert!(outcome.coverage.has_both_groups());

    let rates = read_table(&output).unwrap();
    let names: Vec<&str> = rates.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["YEAR", "MONTH", "is_parent", "rate", "n_obs"]);
    assert_eq!(rates.height(), 18 * 12 * 2);
}

#[test]
fn did_command_fits_rates_from_csv() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cps.csv");
    let rates = dir.path().join("rates.csv");
    let json = dir.path().join("did.json");
    write_extract(&input);
    run_rates(&input, &rates, &Codebook::default()).unwrap();

    let outcome = run_did(&rates, None, Some(&json), &Codebook::default()).unwrap();
    assert!(!outcome.has_errors());
    let fit = outcome.report.group_rate.as_ref().unwrap();
    assert_eq!(fit.n_obs, 18 * 12 * 2);
    assert_eq!(fit.n_clusters, 18 * 12);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(written[0]["model"], "group_rate_ols");
    assert_eq!(written[0]["fit"]["cluster_variable"], "month_id");
    assert!(written[0]["fit"]["terms"].is_array());
}

#[test]
fn run_command_writes_every_report() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cps.csv");
    let output_dir = dir.path().join("results");
    write_extract(&input);

    let outcome = run_pipeline(&input, &output_dir, true, &Codebook::default()).unwrap();
    for file in [RATES_FILE, GAP_FILE, DID_JSON_FILE, DID_SUMMARY_FILE] {
        assert!(output_dir.join(file).exists(), "{file} missing");
    }
    assert!(outcome.did.report.group_rate.is_ok());
    assert!(outcome.did.report.person_month.is_some());

    let gap = read_table(&output_dir.join(GAP_FILE)).unwrap();
    assert_eq!(gap.height(), 18 * 12);

    let summary = fs::read_to_string(output_dir.join(DID_SUMMARY_FILE)).unwrap();
    assert!(summary.contains("== group-rate OLS =="));
    assert!(summary.contains("is_parent:P3"));
    assert!(!summary.contains('\u{1b}'));
}

#[test]
fn codebook_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("codebook.toml");
    fs::write(
        &path,
        "absent_codes = [1]\n\n\
         [[own_illness]]\ncodes = [10, 11]\n\n\
         [eligibility]\nemployment_codes = [10]\nmin_age = 18\nmax_age = 64\n",
    )
    .unwrap();

    let codebook = load_codebook(Some(&path)).unwrap();
    assert_eq!(codebook.own_illness_codes(Some(2010)).unwrap().len(), 2);
    assert_eq!(codebook.eligibility.max_age, 64);
    assert_eq!(codebook.periods.p2_start, 2008);
    assert_eq!(load_codebook(None).unwrap(), Codebook::default());
}

#[test]
fn invalid_codebook_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("codebook.toml");
    fs::write(&path, "[periods]\np1_start = 2010\np2_start = 2000\np3_start = 2020\n").unwrap();
    let err = load_codebook(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("invalid codebook"));
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cps.dat");
    fs::write(&input, "YEAR\n2010\n").unwrap();
    let output = dir.path().join("rates.csv");
    assert!(run_rates(&input, &output, &Codebook::default()).is_err());
}
