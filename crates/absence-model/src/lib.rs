pub mod codebook;
pub mod columns;
pub mod error;
pub mod results;

pub use codebook::{
    Codebook, CoverageOptions, Eligibility, GlmOptions, Period, PeriodBoundaries, ReasonCodeRule,
};
pub use error::{Error, Result};
pub use results::{Coefficient, ModelFit, ModelKind, PARENT_X_P2, PARENT_X_P3};
