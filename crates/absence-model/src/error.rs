use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors surfaced by the absence pipeline stages.
///
/// Data-quality problems in individual cells never reach this type; they are
/// absorbed as nulls during recoding. Only structural problems are reported.
#[derive(Debug, Error)]
pub enum Error {
    /// A column required by a stage is absent from its input table.
    #[error("{stage}: required column '{column}' not found")]
    MissingColumn { stage: &'static str, column: String },

    /// The regression design cannot identify the requested coefficients.
    #[error("{model}: degenerate design: {reason}")]
    DegenerateDesign { model: &'static str, reason: String },

    /// Iterative fitting ran out of iterations before converging.
    #[error("{model}: did not converge after {iterations} iterations")]
    NotConverged {
        model: &'static str,
        iterations: usize,
    },

    /// Codebook configuration failed validation or parsing.
    #[error("invalid codebook: {0}")]
    InvalidCodebook(String),

    /// Unexpected DataFrame failure.
    #[error("dataframe operation failed: {0}")]
    Frame(#[from] PolarsError),
}

impl Error {
    pub fn missing_column(stage: &'static str, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            stage,
            column: column.into(),
        }
    }

    pub fn degenerate(model: &'static str, reason: impl Into<String>) -> Self {
        Self::DegenerateDesign {
            model,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
