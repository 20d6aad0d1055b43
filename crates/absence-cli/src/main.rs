//! Parent own-illness absence pipeline CLI.

use absence_cli::commands::{load_codebook, run_did, run_pipeline, run_rates};
use absence_cli::logging::{LogConfig, init_logging};
use absence_cli::summary::{print_did_summary, print_rates_summary, print_run_summary};
use absence_model::Codebook;
use clap::Parser;
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    if let Command::Codebook = cli.command {
        print!("{}", Codebook::default().to_toml_string()?);
        return Ok(0);
    }
    let codebook = load_codebook(cli.codebook.as_deref())?;
    let code = match &cli.command {
        Command::Rates(args) => {
            let outcome = run_rates(&args.input, &args.output, &codebook)?;
            print_rates_summary(&outcome);
            0
        }
        Command::Did(args) => {
            let outcome = run_did(
                &args.rates,
                args.micro.as_deref(),
                args.json.as_deref(),
                &codebook,
            )?;
            print_did_summary(&outcome);
            i32::from(outcome.has_errors())
        }
        Command::Run(args) => {
            let outcome = run_pipeline(&args.input, &args.output_dir, args.with_glm, &codebook)?;
            print_run_summary(&outcome);
            i32::from(outcome.did.has_errors())
        }
        Command::Codebook => 0,
    };
    Ok(code)
}

/// Logging configuration from the global flags; `--log-level` wins over
/// `-v`/`-q`, and either one overrides `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let explicit = cli.log_level.map(LevelFilter::from);
    let level = explicit.unwrap_or_else(|| cli.verbosity.tracing_level_filter());
    LogConfig::at_level(level, explicit.is_some() || cli.verbosity.is_present())
        .with_format(cli.log_format.into())
        .with_log_file(cli.log_file.clone())
        .with_color(cli.color.color)
}
