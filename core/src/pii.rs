//! PII exposure checks.
//!
//! Column level: does an output table carry a column that is itself PII?
//! Value level: do cells look like emails, phone numbers, SSNs or card numbers?

use crate::{config::PolicyConfig, error::ComplianceResult, table::Table};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sensitive column labels checked regardless of policy.
pub const UNIVERSAL_PII_LABELS: &[&str] = &["name", "email", "phone"];

// ── Column exposure ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PiiExposureChecker {
    /// Lowercased policy names plus the universal labels.
    sensitive: HashSet<String>,
}

impl PiiExposureChecker {
    pub fn new(pii_field_names: &[String]) -> Self {
        let sensitive = pii_field_names
            .iter()
            .map(|n| n.to_lowercase())
            .chain(UNIVERSAL_PII_LABELS.iter().map(|n| n.to_string()))
            .collect();
        Self { sensitive }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(&policy.fields.pii_field_names)
    }

    /// True iff any column name equals a sensitive name, ignoring case.
    pub fn has_pii_exposure<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        !self.exposed_columns(columns).is_empty()
    }

    /// The offending columns, in input order.
    pub fn exposed_columns<'a, S: AsRef<str>>(&self, columns: &'a [S]) -> Vec<&'a str> {
        let exposed: Vec<&str> = columns
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| self.sensitive.contains(&c.to_lowercase()))
            .collect();
        if !exposed.is_empty() {
            log::warn!("PII exposure: columns {:?}", exposed);
        }
        exposed
    }
}

// ── Value scanning ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiKind {
    Email,
    Phone,
    Ssn,
    CreditCard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiFinding {
    pub row:    usize,
    pub column: String,
    pub kind:   PiiKind,
}

pub struct PiiScanner {
    patterns: Vec<(PiiKind, Regex)>,
    ssn:      Regex,
    account:  Regex,
}

impl PiiScanner {
    pub fn new() -> ComplianceResult<Self> {
        let patterns = vec![
            (PiiKind::Email, Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")?),
            (PiiKind::Phone, Regex::new(r"^\+?1?\d{9,15}$")?),
            (PiiKind::Ssn, Regex::new(r"^\d{3}-?\d{2}-?\d{4}$")?),
            (PiiKind::CreditCard, Regex::new(r"^\d{4}-?\d{4}-?\d{4}-?\d{4}$")?),
        ];
        Ok(Self {
            patterns,
            ssn:     Regex::new(r"\b\d{3}-\d{2}-\d{4}\b")?,
            account: Regex::new(r"\b[A-Z]{2}\d{4}[A-Z]{3}\b")?,
        })
    }

    /// One finding per matching (cell, kind), row-major order.
    ///
    /// A bare 9-digit number matches both phone and SSN; both are reported.
    pub fn scan(&self, table: &Table) -> Vec<PiiFinding> {
        let mut findings = Vec::new();
        for (row, cells) in table.rows.iter().enumerate() {
            for (column, value) in table.columns.iter().zip(cells) {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                for (kind, pattern) in &self.patterns {
                    if pattern.is_match(value) {
                        findings.push(PiiFinding { row, column: column.clone(), kind: *kind });
                    }
                }
            }
        }
        log::debug!("PII scan: {} findings over {} rows", findings.len(), table.len());
        findings
    }

    /// Mask SSNs and account references in free text.
    pub fn redact(&self, text: &str) -> String {
        let masked = self.ssn.replace_all(text, "[SSN]");
        self.account.replace_all(&masked, "[ACCT]").into_owned()
    }
}
