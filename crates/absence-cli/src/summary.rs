use std::collections::BTreeSet;

use absence_did::DidReport;
use absence_model::{Coefficient, ModelFit, ModelKind, Result as ModelResult};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::types::{DidOutcome, RatesOutcome, RunOutcome};

/// Significance level used to highlight coefficients.
const HIGHLIGHT_P: f64 = 0.05;

pub fn print_rates_summary(outcome: &RatesOutcome) {
    println!("Rates: {}", outcome.output.display());
    println!("{}", rates_table(outcome));
}

pub fn print_did_summary(outcome: &DidOutcome) {
    if let Some(path) = &outcome.json {
        println!("Model output: {}", path.display());
    }
    print!("{}", render_report(&outcome.report, true));
    if outcome.has_errors() {
        eprintln!("Errors:");
        for error in report_errors(&outcome.report) {
            eprintln!("- {error}");
        }
    }
}

pub fn print_run_summary(outcome: &RunOutcome) {
    print_rates_summary(&outcome.rates);
    println!("Gap series: {}", outcome.gap.display());
    println!("Summary: {}", outcome.summary.display());
    print_did_summary(&outcome.did);
}

fn rates_table(outcome: &RatesOutcome) -> Table {
    let coverage = &outcome.coverage;
    let mut table = Table::new();
    table.set_header(vec![header_cell("Measure"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let month = |value: Option<(i64, i64)>| match value {
        Some((year, month)) => Cell::new(format!("{year}-{month:02}")),
        None => dim_cell("-"),
    };
    let months = if coverage.meets(outcome.min_months) {
        Cell::new(coverage.months)
    } else {
        Cell::new(format!("{} (< {})", coverage.months, outcome.min_months))
            .fg(Color::Yellow)
            .add_attribute(Attribute::Bold)
    };
    table.add_row(vec![Cell::new("Input records"), Cell::new(outcome.input_rows)]);
    table.add_row(vec![Cell::new("Rate rows"), Cell::new(outcome.rate_rows)]);
    table.add_row(vec![Cell::new("Survey months"), months]);
    table.add_row(vec![Cell::new("First month"), month(coverage.first)]);
    table.add_row(vec![Cell::new("Last month"), month(coverage.last)]);
    let groups = if coverage.parent_groups.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(parent_groups(&coverage.parent_groups))
    };
    table.add_row(vec![Cell::new("Parent groups"), groups]);
    table
}

fn parent_groups(groups: &BTreeSet<i64>) -> String {
    groups
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text report of every model in `report`, fixed effects collapsed.
///
/// Unstyled output carries no ANSI escapes and is suitable for files.
pub fn render_report(report: &DidReport, styled: bool) -> String {
    let mut text = String::new();
    render_result(&mut text, ModelKind::GroupRateOls, &report.group_rate, styled);
    if let Some(result) = &report.person_month {
        render_result(&mut text, ModelKind::PersonMonthGlm, result, styled);
    }
    text
}

fn render_result(
    text: &mut String,
    kind: ModelKind,
    result: &ModelResult<ModelFit>,
    styled: bool,
) {
    text.push_str(&format!("== {} ==\n", kind.label()));
    match result {
        Ok(fit) => {
            text.push_str(&fit_header(fit));
            text.push_str(&format!("{}\n\n", coefficient_table(fit, styled)));
        }
        Err(error) => text.push_str(&format!("not estimated: {error}\n\n")),
    }
}

fn fit_header(fit: &ModelFit) -> String {
    let mut header = format!(
        "observations: {}  clusters ({}): {}  dropped rows: {}\n",
        fit.n_obs, fit.cluster_variable, fit.n_clusters, fit.dropped_rows
    );
    if let Some(r_squared) = fit.r_squared {
        header.push_str(&format!("R-squared: {r_squared:.4}\n"));
    }
    if let (Some(deviance), Some(iterations)) = (fit.deviance, fit.iterations) {
        header.push_str(&format!(
            "deviance: {deviance:.3}  IRLS iterations: {iterations}\n"
        ));
    }
    header
}

/// Coefficient table for the non-fixed-effect terms.
pub fn coefficient_table(fit: &ModelFit, styled: bool) -> Table {
    let statistic = match fit.model {
        ModelKind::GroupRateOls => ("t", "P>|t|"),
        ModelKind::PersonMonthGlm => ("z", "P>|z|"),
    };
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Term"),
        header_cell("Estimate"),
        header_cell("Std. Err."),
        header_cell(statistic.0),
        header_cell(statistic.1),
    ]);
    apply_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let (fixed, shown): (Vec<&Coefficient>, Vec<&Coefficient>) =
        fit.terms.iter().partition(|c| is_fixed_effect(&c.term));
    for coefficient in shown {
        table.add_row(coefficient_row(coefficient));
    }
    if !fixed.is_empty() {
        table.add_row(vec![
            dim_cell(format!("({} fixed-effect terms)", fixed.len())),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
        ]);
    }
    if !styled {
        table.force_no_tty();
    }
    table
}

fn coefficient_row(coefficient: &Coefficient) -> Vec<Cell> {
    let term = if coefficient.term.contains(':') {
        Cell::new(&coefficient.term).add_attribute(Attribute::Bold)
    } else {
        Cell::new(&coefficient.term)
    };
    let p_value = if coefficient.p_value < HIGHLIGHT_P {
        Cell::new(format!("{:.4}", coefficient.p_value)).fg(Color::Green)
    } else {
        Cell::new(format!("{:.4}", coefficient.p_value))
    };
    vec![
        term,
        Cell::new(format!("{:.6}", coefficient.estimate)),
        Cell::new(format!("{:.6}", coefficient.std_error)),
        Cell::new(format!("{:.3}", coefficient.statistic)),
        p_value,
    ]
}

fn is_fixed_effect(term: &str) -> bool {
    term.starts_with("C(")
}

fn report_errors(report: &DidReport) -> Vec<String> {
    let mut errors = Vec::new();
    if let Err(error) = &report.group_rate {
        errors.push(error.to_string());
    }
    if let Some(Err(error)) = &report.person_month {
        errors.push(error.to_string());
    }
    errors
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use absence_transform::RateCoverage;

    fn fit() -> ModelFit {
        let coefficient = |term: &str, p_value: f64| Coefficient {
            term: term.to_string(),
            estimate: 0.01,
            std_error: 0.002,
            statistic: 5.0,
            p_value,
        };
        ModelFit {
            model: ModelKind::GroupRateOls,
            terms: vec![
                coefficient("Intercept", 0.0),
                coefficient("C(MONTH)[T.2]", 0.3),
                coefficient("is_parent", 0.2),
                coefficient("is_parent:P2", 0.01),
            ],
            n_obs: 48,
            n_clusters: 24,
            cluster_variable: "month_id".to_string(),
            dropped_rows: 0,
            r_squared: Some(0.5),
            deviance: None,
            iterations: None,
        }
    }

    #[test]
    fn table_collapses_fixed_effects() {
        let rendered = coefficient_table(&fit(), false).to_string();
        assert!(rendered.contains("is_parent:P2"));
        assert!(!rendered.contains("C(MONTH)[T.2]"));
        assert!(rendered.contains("(1 fixed-effect terms)"));
        assert!(rendered.contains("P>|t|"));
    }

    #[test]
    fn rates_table_lists_parent_groups() {
        let outcome = RatesOutcome {
            input_rows: 12,
            rate_rows: 4,
            coverage: RateCoverage {
                months: 2,
                first: Some((2010, 1)),
                last: Some((2010, 2)),
                parent_groups: BTreeSet::from([0, 1]),
            },
            min_months: 300,
            output: PathBuf::from("cps_absence_rates.csv"),
        };
        let mut table = rates_table(&outcome);
        table.force_no_tty();
        let rendered = table.to_string();
        assert!(rendered.contains("0, 1"));
        assert!(rendered.contains("2 (< 300)"));
        assert!(rendered.contains("2010-01"));
    }

    #[test]
    fn report_notes_failed_models() {
        let report = DidReport {
            group_rate: Ok(fit()),
            person_month: Some(Err(absence_model::Error::degenerate(
                "person_month_glm",
                "no variation in P3",
            ))),
        };
        let text = render_report(&report, false);
        assert!(text.contains("== group-rate OLS =="));
        assert!(text.contains("R-squared: 0.5000"));
        assert!(text.contains("not estimated: person_month_glm: degenerate design: no variation in P3"));
    }
}
