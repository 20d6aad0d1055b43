//! CLI argument definitions for the absence pipeline.

use std::path::PathBuf;

use absence_cli::logging::LogFormat;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(
    name = "absence",
    version,
    about = "Parent own-illness absence rates and difference-in-differences models",
    long_about = "Build monthly own-illness absence rates for parents and non-parents \
                  from CPS person-month records, then estimate how the parent gap \
                  shifted across the 1994-2007, 2008-2019, and 2020+ periods.\n\n\
                  Inputs may be CSV or Parquet, chosen by file extension."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Codebook TOML overriding the default reason codes, eligibility, and periods.
    #[arg(long = "codebook", value_name = "TOML", global = true)]
    pub codebook: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Aggregate a person-month extract into monthly rates by parent status.
    Rates(RatesArgs),

    /// Fit the DiD models on a monthly rate table.
    Did(DidArgs),

    /// Run every stage and write rates, gap series, and model reports.
    Run(RunArgs),

    /// Print the default codebook as TOML.
    Codebook,
}

#[derive(Parser)]
pub struct RatesArgs {
    /// Person-month extract (.csv or .parquet).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output CSV for the rate table.
    #[arg(short = 'o', long = "output", value_name = "CSV")]
    pub output: PathBuf,
}

#[derive(Parser)]
pub struct DidArgs {
    /// Monthly rate table with YEAR, MONTH, is_parent, and rate.
    #[arg(value_name = "RATES")]
    pub rates: PathBuf,

    /// Person-month extract for the binomial GLM (needs STATEFIP).
    #[arg(long = "micro", value_name = "INPUT")]
    pub micro: Option<PathBuf>,

    /// Write model output as JSON.
    #[arg(long = "json", value_name = "PATH")]
    pub json: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Person-month extract (.csv or .parquet).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory for the rate table, gap series, and model reports.
    #[arg(long = "output-dir", value_name = "DIR", default_value = "results")]
    pub output_dir: PathBuf,

    /// Also fit the person-month GLM on the eligible records.
    #[arg(long = "with-glm")]
    pub with_glm: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn log_level_flag_maps_to_filter() {
        let cli = Cli::try_parse_from(["absence", "--log-level", "debug", "codebook"]).unwrap();
        assert_eq!(cli.log_level.map(LevelFilter::from), Some(LevelFilter::DEBUG));
        assert_eq!(LogFormat::from(LogFormatArg::Json), LogFormat::Json);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn did_accepts_global_codebook_after_subcommand() {
        let cli = Cli::try_parse_from([
            "absence",
            "did",
            "rates.csv",
            "--micro",
            "cps.parquet",
            "--codebook",
            "codes.toml",
        ])
        .unwrap();
        assert_eq!(cli.codebook, Some(PathBuf::from("codes.toml")));
        match cli.command {
            Command::Did(args) => {
                assert_eq!(args.micro, Some(PathBuf::from("cps.parquet")));
                assert!(args.json.is_none());
            }
            _ => panic!("expected did"),
        }
    }
}
