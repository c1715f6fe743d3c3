//! In-memory table of raw text cells.
//!
//! Cells stay as text; each check coerces the columns it needs and
//! isolates rows that fail coercion.

use crate::error::{ComplianceError, ComplianceResult};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows:    Vec<Vec<String>>,
}

impl Table {
    /// Build a table, rejecting any row whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> ComplianceResult<Self> {
        let table = Self { columns, rows };
        table.check_shape()?;
        Ok(table)
    }

    /// Convenience constructor for literals.
    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> ComplianceResult<Self> {
        Self::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> ComplianceResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Self::new(columns, rows)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> ComplianceResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let table = Self::from_csv_reader(file)?;
        log::debug!(
            "loaded {} rows x {} columns from {}",
            table.len(),
            table.columns.len(),
            path.display()
        );
        Ok(table)
    }

    /// Tables arriving over serde skip `new`; callers re-check here.
    pub fn check_shape(&self) -> ComplianceResult<()> {
        let expected = self.columns.len();
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(ComplianceError::RaggedRow { row, expected, actual: cells.len() });
            }
        }
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
