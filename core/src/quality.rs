//! Completeness and format profiling of sample data.

use crate::{
    compliance::{Finding, Severity},
    config::PolicyConfig,
    error::ComplianceResult,
    table::Table,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DATE_COLUMN: &str = "date";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub total_values:    usize,
    pub complete_values: usize,
    /// Percent of non-empty values.
    pub completeness:    f64,
    /// 100 minus the percent of values that failed a format check.
    pub accuracy:        f64,
    pub findings:        Vec<Finding>,
}

pub struct SampleProfiler {
    /// Lowercase column name -> compiled pattern.
    formats: BTreeMap<String, Regex>,
}

impl SampleProfiler {
    pub fn new(format_rules: &BTreeMap<String, String>) -> ComplianceResult<Self> {
        let mut formats = BTreeMap::new();
        for (column, pattern) in format_rules {
            formats.insert(column.to_lowercase(), Regex::new(pattern)?);
        }
        Ok(Self { formats })
    }

    pub fn from_policy(policy: &PolicyConfig) -> ComplianceResult<Self> {
        Self::new(&policy.fields.format_rules)
    }

    pub fn profile(&self, table: &Table) -> QualityProfile {
        let mut total = 0usize;
        let mut complete = 0usize;
        let mut findings = Vec::new();

        let checks: Vec<(&str, Option<&Regex>)> = table
            .columns
            .iter()
            .map(|c| (c.as_str(), self.formats.get(&c.to_lowercase())))
            .collect();

        for cells in &table.rows {
            for ((column, format), value) in checks.iter().zip(cells) {
                total += 1;
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                complete += 1;

                let failed = if column.eq_ignore_ascii_case(DATE_COLUMN) {
                    NaiveDate::parse_from_str(value, DATE_FORMAT).is_err()
                } else {
                    format.map_or(false, |re| !re.is_match(value))
                };
                if failed {
                    findings.push(Finding {
                        severity: Severity::Medium,
                        message:  format!("Invalid {} format: {}", column.to_lowercase(), value),
                    });
                }
            }
        }

        let (completeness, accuracy) = if total == 0 {
            (0.0, 0.0)
        } else {
            let total = total as f64;
            (
                complete as f64 / total * 100.0,
                100.0 - findings.len() as f64 / total * 100.0,
            )
        };

        QualityProfile {
            total_values: total,
            complete_values: complete,
            completeness,
            accuracy,
            findings,
        }
    }
}
