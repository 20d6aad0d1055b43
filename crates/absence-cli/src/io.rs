//! Table input and output by file extension.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use polars::prelude::{
    CsvReadOptions, CsvWriter, DataFrame, ParquetReader, SerReader, SerWriter,
};
use tracing::debug;

/// Supported table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet" | "pq") => Ok(Self::Parquet),
            _ => bail!(
                "unsupported table format for {} (expected .csv or .parquet)",
                path.display()
            ),
        }
    }
}

/// Read a CSV or Parquet table.
///
/// CSV cells are read as text so every value passes through the recoder's
/// lenient parsing instead of failing schema inference.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let df = match TableFormat::from_path(path)? {
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("open {}", path.display()))?
            .finish()
            .with_context(|| format!("read {}", path.display()))?,
        TableFormat::Parquet => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            ParquetReader::new(file)
                .finish()
                .with_context(|| format!("read {}", path.display()))?
        }
    };
    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "table loaded");
    Ok(df)
}

/// Write a table as CSV with a header row, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), rows = df.height(), "table written");
    Ok(())
}
