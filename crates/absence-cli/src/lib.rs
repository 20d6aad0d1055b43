//! Library side of the `absence` command-line driver.

pub mod commands;
pub mod io;
pub mod logging;
pub mod summary;
pub mod types;
