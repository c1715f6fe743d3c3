//! AML risk detection over a batch of transaction records.
//!
//! Two independent signals:
//! - Large transactions: `Amount` strictly above the AML threshold.
//! - Rapid-fire transactions: ordered by `Date`, a record arriving less than
//!   the rapid window after its predecessor with `Amount` above the floor.
//!
//! A missing `Amount` column disables both checks; a missing `Date` column
//! disables the rapid-fire check. With `Amount` present, a missing
//! `Transaction_ID` column is an error since flagged rows could not be
//! reported. Records whose amount or date cannot be coerced are logged and
//! excluded from the affected check only.

use crate::{
    config::{AmlRules, PolicyConfig},
    error::{ComplianceError, ComplianceResult},
    table::Table,
    types::TransactionId,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Constants ────────────────────────────────────────────────────────────────

pub const TRANSACTION_ID_COLUMN: &str = "Transaction_ID";
pub const AMOUNT_COLUMN: &str = "Amount";
pub const DATE_COLUMN: &str = "Date";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Data Structures ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Input order.
    pub high_risk:  Vec<TransactionId>,
    /// Date order.
    pub suspicious: Vec<TransactionId>,
}

impl RiskReport {
    pub fn is_empty(&self) -> bool {
        self.high_risk.is_empty() && self.suspicious.is_empty()
    }
}

// ── Detector ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RiskDetector {
    rules: AmlRules,
}

impl RiskDetector {
    pub fn new(rules: AmlRules) -> Self {
        Self { rules }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.aml.clone())
    }

    pub fn rules(&self) -> &AmlRules {
        &self.rules
    }

    /// Flag transactions that need AML review.
    ///
    /// Errors only on structural problems with the batch itself (ragged rows,
    /// missing or duplicate transaction ids). Bad individual values never
    /// abort the batch.
    pub fn detect_risks(&self, transactions: &Table) -> ComplianceResult<RiskReport> {
        transactions.check_shape()?;
        let mut report = RiskReport::default();

        let Some(amount_idx) = transactions.column_index(AMOUNT_COLUMN) else {
            log::debug!("no {AMOUNT_COLUMN} column; risk checks skipped");
            return Ok(report);
        };
        let id_idx = transactions
            .column_index(TRANSACTION_ID_COLUMN)
            .ok_or_else(|| ComplianceError::MissingColumn { column: TRANSACTION_ID_COLUMN.into() })?;

        let ids: Vec<&str> = transactions.rows.iter().map(|r| r[id_idx].as_str()).collect();
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ComplianceError::DuplicateTransactionId { transaction_id: dup.to_string() });
        }

        let amounts: Vec<Option<Decimal>> = transactions
            .rows
            .iter()
            .enumerate()
            .map(|(row, cells)| coerce(row, AMOUNT_COLUMN, &cells[amount_idx], parse_amount))
            .collect();

        // Large transactions, input order.
        for (row, amount) in amounts.iter().enumerate() {
            if let Some(amount) = amount {
                if *amount > self.rules.aml_threshold {
                    log::warn!(
                        "high-risk transaction {}: amount {} exceeds AML threshold {}",
                        ids[row],
                        amount,
                        self.rules.aml_threshold
                    );
                    report.high_risk.push(ids[row].to_string());
                }
            }
        }

        // Rapid-fire transactions, date order.
        if let Some(date_idx) = transactions.column_index(DATE_COLUMN) {
            let mut dated: Vec<(usize, NaiveDateTime)> = transactions
                .rows
                .iter()
                .enumerate()
                .filter_map(|(row, cells)| {
                    coerce(row, DATE_COLUMN, &cells[date_idx], parse_timestamp).map(|ts| (row, ts))
                })
                .collect();
            // Stable: ties keep input order.
            dated.sort_by(|a, b| a.1.cmp(&b.1));

            let window_ms = self.rules.rapid_window_seconds.saturating_mul(1000);
            for pair in dated.windows(2) {
                let (_, prev_ts) = pair[0];
                let (row, ts) = pair[1];
                let delta_ms = (ts - prev_ts).num_milliseconds();
                let Some(amount) = amounts[row] else { continue };

                if delta_ms < window_ms && amount > self.rules.rapid_amount_floor {
                    log::warn!(
                        "suspicious transaction {}: amount {} within {}s of previous transaction",
                        ids[row],
                        amount,
                        delta_ms / 1000
                    );
                    report.suspicious.push(ids[row].to_string());
                }
            }
        }

        log::debug!(
            "risk scan: {} records, {} high risk, {} suspicious",
            transactions.len(),
            report.high_risk.len(),
            report.suspicious.len()
        );
        Ok(report)
    }
}

/// Coerce one cell, logging and discarding it on failure.
fn coerce<T>(
    row: usize,
    column: &str,
    raw: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Option<T> {
    match parse(raw.trim()) {
        Ok(value) => Some(value),
        Err(reason) => {
            let err = ComplianceError::MalformedRecord {
                row,
                column: column.to_string(),
                value: raw.to_string(),
                reason,
            };
            log::warn!("{err}; record excluded from {column} check");
            None
        }
    }
}

pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| e.to_string())
}

/// Accepts RFC 3339, ISO-like date-times with `T` or space, and bare dates.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("unrecognised timestamp '{raw}'"))
}
