use std::fs;
use std::path::Path;
use std::time::Instant;

use absence_did::{DidEstimator, DidReport};
use absence_model::{Codebook, ModelFit, Result as ModelResult};
use absence_transform::{
    RateCoverage, aggregate_monthly_rates, build_rates, eligible_rows, parent_gap,
    prepare_microdata, rate_coverage,
};
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::io::{read_table, write_csv};
use crate::summary::render_report;
use crate::types::{DidOutcome, RatesOutcome, RunOutcome};

pub const RATES_FILE: &str = "cps_absence_rates.csv";
pub const GAP_FILE: &str = "parent_gap.csv";
pub const DID_JSON_FILE: &str = "did_results.json";
pub const DID_SUMMARY_FILE: &str = "did_summary.txt";

/// Load a codebook from TOML, or the built-in defaults.
pub fn load_codebook(path: Option<&Path>) -> Result<Codebook> {
    let Some(path) = path else {
        return Ok(Codebook::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("read codebook {}", path.display()))?;
    Codebook::from_toml_str(&text).with_context(|| format!("load codebook {}", path.display()))
}

/// Raw extract to monthly rate table.
pub fn run_rates(input: &Path, output: &Path, codebook: &Codebook) -> Result<RatesOutcome> {
    let span = info_span!("rates", input = %input.display());
    let _guard = span.enter();

    let raw = read_table(input)?;
    let mut rates = build_rates(&raw, codebook)?;
    let coverage = check_coverage(&rates, codebook)?;
    write_csv(&mut rates, output)?;
    Ok(RatesOutcome {
        input_rows: raw.height(),
        rate_rows: rates.height(),
        coverage,
        min_months: codebook.coverage.min_months,
        output: output.to_path_buf(),
    })
}

/// Fit the DiD models on an existing rate table and optional microdata.
pub fn run_did(
    rates_path: &Path,
    micro_path: Option<&Path>,
    json: Option<&Path>,
    codebook: &Codebook,
) -> Result<DidOutcome> {
    let span = info_span!("did", rates = %rates_path.display());
    let _guard = span.enter();

    let rates = read_table(rates_path)?;
    let micro = match micro_path {
        Some(path) => Some(glm_population(&read_table(path)?, codebook)?),
        None => None,
    };
    let report = DidEstimator::new(codebook).fit_all(&rates, micro.as_ref());
    if let Some(path) = json {
        write_report_json(&report, path)?;
    }
    Ok(DidOutcome {
        report,
        json: json.map(Path::to_path_buf),
        glm_requested: micro_path.is_some(),
    })
}

/// Full pipeline: rates, gap series, DiD models, and written reports.
pub fn run_pipeline(
    input: &Path,
    output_dir: &Path,
    with_glm: bool,
    codebook: &Codebook,
) -> Result<RunOutcome> {
    let span = info_span!("run", input = %input.display(), with_glm);
    let _guard = span.enter();
    let start = Instant::now();

    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir {}", output_dir.display()))?;

    let raw = read_table(input)?;
    let micro = prepare_microdata(&raw, codebook)?;
    let mut rates = aggregate_monthly_rates(&micro, &codebook.eligibility)?;
    let coverage = check_coverage(&rates, codebook)?;
    let mut gap = parent_gap(&rates)?;

    let rates_path = output_dir.join(RATES_FILE);
    let gap_path = output_dir.join(GAP_FILE);
    write_csv(&mut rates, &rates_path)?;
    write_csv(&mut gap, &gap_path)?;

    let population = if with_glm {
        Some(eligible_rows(&micro, &codebook.eligibility)?)
    } else {
        None
    };
    let report = DidEstimator::new(codebook).fit_all(&rates, population.as_ref());

    let json_path = output_dir.join(DID_JSON_FILE);
    write_report_json(&report, &json_path)?;
    let summary_path = output_dir.join(DID_SUMMARY_FILE);
    fs::write(&summary_path, render_report(&report, false))
        .with_context(|| format!("write {}", summary_path.display()))?;

    info!(
        input_rows = raw.height(),
        rate_rows = rates.height(),
        duration_ms = start.elapsed().as_millis(),
        "pipeline complete"
    );
    Ok(RunOutcome {
        rates: RatesOutcome {
            input_rows: raw.height(),
            rate_rows: rates.height(),
            coverage,
            min_months: codebook.coverage.min_months,
            output: rates_path,
        },
        gap: gap_path,
        did: DidOutcome {
            report,
            json: Some(json_path),
            glm_requested: with_glm,
        },
        summary: summary_path,
    })
}

/// Flagged, eligible person-months for the GLM.
fn glm_population(raw: &DataFrame, codebook: &Codebook) -> Result<DataFrame> {
    let micro = prepare_microdata(raw, codebook)?;
    Ok(eligible_rows(&micro, &codebook.eligibility)?)
}

fn check_coverage(rates: &DataFrame, codebook: &Codebook) -> Result<RateCoverage> {
    let coverage = rate_coverage(rates)?;
    let min_months = codebook.coverage.min_months;
    if !coverage.meets(min_months) {
        warn!(
            months = coverage.months,
            min_months, "rate table covers fewer months than expected"
        );
    }
    if !coverage.has_both_groups() {
        warn!("rate table lacks a parent or non-parent group");
    }
    Ok(coverage)
}

#[derive(Serialize)]
struct ModelRecord<'a> {
    model: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fit: Option<&'a ModelFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> ModelRecord<'a> {
    fn new(model: &'static str, result: &'a ModelResult<ModelFit>) -> Self {
        match result {
            Ok(fit) => Self {
                model,
                fit: Some(fit),
                error: None,
            },
            Err(error) => Self {
                model,
                fit: None,
                error: Some(error.to_string()),
            },
        }
    }
}

fn write_report_json(report: &DidReport, path: &Path) -> Result<()> {
    let mut records = vec![ModelRecord::new("group_rate_ols", &report.group_rate)];
    if let Some(result) = &report.person_month {
        records.push(ModelRecord::new("person_month_glm", result));
    }
    let json = serde_json::to_string_pretty(&records).context("serialize model output")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}
