//! Per-bin result tables
//!
//! A [`BinTable`] has one row per bin (keyed by the bin's left edge) and one
//! named `f64` column per quantity: a channel, a moment, a flux. Missing
//! values are NaN in memory, an empty field in CSV and `null` in JSON.

use crate::bins::BinLayout;
use crate::error::{EddyError, Result};
use serde::Serialize;

/// One named column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Table with one row per bin
#[derive(Debug, Clone, PartialEq)]
pub struct BinTable {
    lefts: Vec<f64>,
    columns: Vec<TableColumn>,
}

/// Per-bin table of moments, one column per moment name
pub type MomentTable = BinTable;

#[derive(Serialize)]
struct JsonTable<'a> {
    bin_left: &'a [f64],
    columns: Vec<JsonColumn<'a>>,
}

#[derive(Serialize)]
struct JsonColumn<'a> {
    name: &'a str,
    values: Vec<Option<f64>>,
}

impl BinTable {
    /// Empty table with the given row keys
    pub fn new(lefts: Vec<f64>) -> Self {
        Self {
            lefts,
            columns: Vec::new(),
        }
    }

    /// Empty table keyed by the bins of `layout`
    pub fn for_layout(layout: &BinLayout) -> Self {
        Self::new(layout.bin_set().lefts())
    }

    /// Add a column, replacing one of the same name
    ///
    /// # Errors
    /// `UnsupportedInput` when the column length differs from the row count
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.lefts.len() {
            return Err(EddyError::input(format!(
                "column '{}' has {} rows but the table has {}",
                name,
                values.len(),
                self.lefts.len()
            )));
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(TableColumn { name, values }),
        }
        Ok(())
    }

    /// Add a column of counts
    pub fn push_counts(&mut self, name: impl Into<String>, counts: &[usize]) -> Result<()> {
        self.push_column(name, counts.iter().map(|c| *c as f64).collect())
    }

    pub fn lefts(&self) -> &[f64] {
        &self.lefts
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Column by name, or `UnsupportedInput` when absent
    pub fn require(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| EddyError::input(format!("table has no column '{}'", name)))
    }

    /// Number of rows (bins)
    pub fn rows(&self) -> usize {
        self.lefts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lefts.is_empty()
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_value(value: f64) -> String {
        if value.is_nan() {
            String::new()
        } else {
            value.to_string()
        }
    }

    /// CSV with a `bin_left` key column followed by every column
    pub fn to_csv(&self) -> String {
        let mut output = String::from("bin_left");
        for column in &self.columns {
            output.push(',');
            output.push_str(&Self::escape_field(&column.name));
        }
        output.push('\n');

        for (row, left) in self.lefts.iter().enumerate() {
            output.push_str(&left.to_string());
            for column in &self.columns {
                output.push(',');
                output.push_str(&Self::format_value(column.values[row]));
            }
            output.push('\n');
        }

        output
    }

    /// Column-oriented JSON, non-finite values as `null`
    pub fn to_json(&self) -> anyhow::Result<String> {
        let table = JsonTable {
            bin_left: &self.lefts,
            columns: self
                .columns
                .iter()
                .map(|c| JsonColumn {
                    name: &c.name,
                    values: c
                        .values
                        .iter()
                        .map(|v| v.is_finite().then_some(*v))
                        .collect(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&table)?)
    }
}
