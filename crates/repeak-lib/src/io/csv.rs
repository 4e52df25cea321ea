use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;

/// Read one named column of a headered CSV file as samples. Header matching
/// ignores case.
pub fn read_csv_column(path: &Path, column: &str) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = reader.headers().context("reading csv header")?.clone();
    let col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column))
        .with_context(|| format!("column '{column}' not found in {}", path.display()))?;

    let mut out = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading csv row {}", row + 1))?;
        let raw = record
            .get(col)
            .with_context(|| format!("csv row {} is shorter than the header", row + 1))?;
        let value: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("parsing sample '{raw}' on csv row {}", row + 1))?;
        out.push(value);
    }
    if out.is_empty() {
        bail!("no samples in column '{column}' of {}", path.display());
    }
    Ok(out)
}
