use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Parse newline-delimited samples. Blank lines and `#` comments are
/// skipped; a file without a single sample is an error.
pub fn parse_samples(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("parsing sample on line {}", lineno + 1))?;
        out.push(value);
    }
    if out.is_empty() {
        bail!("no numeric samples found");
    }
    Ok(out)
}

pub fn read_samples(path: &Path) -> Result<Vec<f64>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_samples(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Parse newline-delimited peak indices, same comment rules as samples.
/// An empty list is fine; a recording may carry no annotations.
pub fn parse_peak_indices(text: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let index: usize = trimmed
            .parse()
            .with_context(|| format!("parsing peak index on line {}", lineno + 1))?;
        out.push(index);
    }
    Ok(out)
}

pub fn read_peak_indices(path: &Path) -> Result<Vec<usize>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_peak_indices(&text).with_context(|| format!("parsing {}", path.display()))
}
