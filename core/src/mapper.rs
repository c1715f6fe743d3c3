//! Deterministic merge of two source tables on a shared key.

use crate::{
    config::PolicyConfig,
    error::{ComplianceError, ComplianceResult},
    table::Table,
};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_JOIN_KEY: &str = "Customer_ID";

/// Appended (repeatedly, if needed) to a right-hand column whose name is taken.
const COLLISION_SUFFIX: &str = "_right";

#[derive(Debug, Clone)]
pub struct DataMapper {
    required_fields: Vec<String>,
}

impl DataMapper {
    pub fn new(required_fields: Vec<String>) -> Self {
        Self { required_fields }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.fields.required_fields.clone())
    }

    /// Inner join `left` and `right` on `key`, then drop duplicate rows.
    ///
    /// Every required field must be present in both tables. Output rows
    /// follow left order, then right order within each left row.
    pub fn merge(&self, left: &Table, right: &Table, key: &str) -> ComplianceResult<Table> {
        left.check_shape()?;
        right.check_shape()?;

        if let Some(field) = self
            .required_fields
            .iter()
            .find(|f| !left.has_column(f) || !right.has_column(f))
        {
            return Err(ComplianceError::MissingRequiredField { field: field.clone() });
        }

        let left_key = left
            .column_index(key)
            .ok_or_else(|| ComplianceError::MissingColumn { column: key.to_string() })?;
        let right_key = right
            .column_index(key)
            .ok_or_else(|| ComplianceError::MissingColumn { column: key.to_string() })?;

        let mut columns = left.columns.clone();
        let right_kept: Vec<usize> = (0..right.columns.len()).filter(|i| *i != right_key).collect();
        for &i in &right_kept {
            let name = unique_column(&columns, &right.columns[i]);
            columns.push(name);
        }

        let mut right_by_key: HashMap<&str, Vec<usize>> = HashMap::new();
        for (row, cells) in right.rows.iter().enumerate() {
            right_by_key.entry(cells[right_key].as_str()).or_default().push(row);
        }

        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for left_row in &left.rows {
            let Some(matches) = right_by_key.get(left_row[left_key].as_str()) else { continue };
            for &r in matches {
                let mut merged = left_row.clone();
                merged.extend(right_kept.iter().map(|&i| right.rows[r][i].clone()));
                if seen.insert(merged.clone()) {
                    rows.push(merged);
                } else {
                    dropped += 1;
                }
            }
        }

        log::debug!(
            "merged {} x {} rows on {}: {} rows ({} duplicates dropped)",
            left.len(),
            right.len(),
            key,
            rows.len(),
            dropped
        );
        Table::new(columns, rows)
    }
}

/// `name`, suffixed until no column in `taken` carries it.
fn unique_column(taken: &[String], name: &str) -> String {
    let mut candidate = name.to_string();
    while taken.iter().any(|c| *c == candidate) {
        candidate.push_str(COLLISION_SUFFIX);
    }
    candidate
}
