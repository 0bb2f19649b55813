//! Channel-table ingestion and result export
//!
//! Input is a plain CSV table:
//!
//! ```csv
//! time,u,v,w,t
//! 0.00,2.31,-0.42,0.08,14.9
//! 0.05,2.35,-0.40,,14.9
//! ```
//!
//! The first column is the time index in seconds; every other column is a
//! channel named by its header. Empty fields and `nan` are missing samples.

use crate::channel::{ChannelSet, MISSING};
use crate::cli::OutputFormat;
use crate::table::BinTable;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

fn parse_field(field: &str, line: usize, column: &str) -> Result<f64> {
    let field = field.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Ok(MISSING);
    }
    field
        .parse::<f64>()
        .with_context(|| format!("line {}: invalid value '{}' in column '{}'", line, field, column))
}

/// Parse a channel table from CSV text
pub fn parse_channel_csv(content: &str) -> Result<ChannelSet> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let Some((_, header)) = lines.next() else {
        bail!("input is empty");
    };
    let names: Vec<&str> = header.split(',').map(str::trim).collect();
    if names.len() < 2 {
        bail!("header needs a time column and at least one channel, got '{}'", header);
    }
    for (i, name) in names.iter().enumerate().skip(1) {
        if name.is_empty() {
            bail!("header column {} has no name", i + 1);
        }
        if names[1..i].contains(name) {
            bail!("channel '{}' appears twice in the header", name);
        }
    }

    let mut index = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len() - 1];
    for (line, row) in lines {
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != names.len() {
            bail!(
                "line {}: expected {} fields, got {}",
                line,
                names.len(),
                fields.len()
            );
        }

        let time = parse_field(fields[0], line, names[0])?;
        if time.is_nan() {
            bail!("line {}: time value is missing", line);
        }
        index.push(time);
        for (column, (field, name)) in columns.iter_mut().zip(fields[1..].iter().zip(&names[1..])) {
            column.push(parse_field(field, line, name)?);
        }
    }

    let set = ChannelSet::from_columns(index, names[1..].iter().copied().zip(columns))?;
    Ok(set)
}

/// Read a channel table from a CSV file
pub fn read_channel_csv<P: AsRef<Path>>(path: P) -> Result<ChannelSet> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_channel_csv(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write `table` as `<dir>/<stem>.csv` or `<dir>/<stem>.json`
pub fn write_table(dir: &Path, stem: &str, table: &BinTable, format: OutputFormat) -> Result<PathBuf> {
    let (extension, content) = match format {
        OutputFormat::Csv => ("csv", table.to_csv()),
        OutputFormat::Json => ("json", table.to_json()?),
    };
    let path = dir.join(format!("{}.{}", stem, extension));
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
