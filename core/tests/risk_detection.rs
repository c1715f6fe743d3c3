//! Integration tests for AML risk detection.
//!
//! Tests verify:
//! 1. Large transactions are flagged strictly above the threshold, in input order
//! 2. Rapid-fire detection orders by date and skips the earliest record
//! 3. Missing Amount / Date columns disable checks instead of failing
//! 4. Malformed values are isolated to their record
//! 5. Structural problems (missing or duplicate ids, ragged rows) are errors
//! 6. Properties: threshold soundness, earliest record never suspicious, determinism

use bankgen_core::{
    config::AmlRules, risk::RiskDetector, ComplianceError, PolicyConfig, Table,
};
use proptest::prelude::*;
use rust_decimal_macros::dec;

fn detector() -> RiskDetector {
    let _ = env_logger::builder().is_test(true).try_init();
    RiskDetector::from_policy(&PolicyConfig::default_test())
}

fn batch(rows: &[&[&str]]) -> Table {
    Table::from_rows(&["Transaction_ID", "Amount", "Date"], rows).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Large transactions
// ─────────────────────────────────────────────────────────────────────────────

/// The reference scenario: one large transaction, a small one ten minutes later.
#[test]
fn large_transaction_flagged_small_follow_up_ignored() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TX1", "15000", "2023-01-01T00:00:00"],
            &["TX2", "500", "2023-01-01T00:10:00"],
        ]))
        .unwrap();

    assert_eq!(report.high_risk, vec!["TX1"]);
    assert!(report.suspicious.is_empty(), "TX2 is below the rapid floor");
}

/// A value exactly at the threshold is not flagged.
#[test]
fn threshold_is_exclusive() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TX1", "10000", "2023-01-01"],
            &["TX2", "10000.01", "2023-02-01"],
        ]))
        .unwrap();
    assert_eq!(report.high_risk, vec!["TX2"]);
}

/// High-risk ids come out in input order, not date order.
#[test]
fn high_risk_keeps_input_order() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TX9", "20000", "2023-03-01"],
            &["TX1", "30000", "2023-01-01"],
        ]))
        .unwrap();
    assert_eq!(report.high_risk, vec!["TX9", "TX1"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Rapid-fire transactions
// ─────────────────────────────────────────────────────────────────────────────

/// Suspicious ids follow date order and the earliest record is never included.
#[test]
fn rapid_fire_uses_date_order() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TX3", "6000", "2023-01-01T00:50:00"],
            &["TX1", "9000", "2023-01-01T00:00:00"],
            &["TX2", "7000", "2023-01-01T00:20:00"],
        ]))
        .unwrap();

    assert_eq!(report.suspicious, vec!["TX2", "TX3"]);
    assert!(report.high_risk.is_empty());
}

/// The window is exclusive: exactly one hour apart is not rapid.
#[test]
fn rapid_window_is_exclusive() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TX1", "6000", "2023-01-01T00:00:00"],
            &["TX2", "6000", "2023-01-01T01:00:00"],
            &["TX3", "6000", "2023-01-01T01:59:59"],
        ]))
        .unwrap();
    assert_eq!(report.suspicious, vec!["TX3"]);
}

/// A transaction can be both high risk and suspicious.
#[test]
fn record_can_land_in_both_buckets() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TX1", "100", "2023-01-01T00:00:00"],
            &["TX2", "25000", "2023-01-01T00:05:00"],
        ]))
        .unwrap();
    assert_eq!(report.high_risk, vec!["TX2"]);
    assert_eq!(report.suspicious, vec!["TX2"]);
}

/// Identical timestamps keep input order and count as zero seconds apart.
#[test]
fn timestamp_ties_are_stable() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TXA", "8000", "2023-01-01 09:00:00"],
            &["TXB", "8000", "2023-01-01 09:00:00"],
        ]))
        .unwrap();
    assert_eq!(report.suspicious, vec!["TXB"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Missing columns and malformed values
// ─────────────────────────────────────────────────────────────────────────────

/// No Date column: only the large-transaction check runs.
#[test]
fn missing_date_disables_rapid_check() {
    let table = Table::from_rows(
        &["Transaction_ID", "Amount"],
        &[&["TX1", "15000"], &["TX2", "9000"]],
    )
    .unwrap();
    let report = detector().detect_risks(&table).unwrap();
    assert_eq!(report.high_risk, vec!["TX1"]);
    assert!(report.suspicious.is_empty());
}

/// No Amount column: nothing is flagged, and nothing fails.
#[test]
fn missing_amount_disables_everything() {
    let table = Table::from_rows(
        &["Transaction_ID", "Date"],
        &[&["TX1", "2023-01-01"], &["TX2", "2023-01-01"]],
    )
    .unwrap();
    assert!(detector().detect_risks(&table).unwrap().is_empty());
}

/// Amounts without an id column cannot be reported, so the batch is rejected.
#[test]
fn missing_transaction_id_column_rejected() {
    let table = Table::from_rows(&["Txn", "Amount"], &[&["T1", "999999"]]).unwrap();
    let err = detector().detect_risks(&table).unwrap_err();
    assert!(matches!(err, ComplianceError::MissingColumn { column } if column == "Transaction_ID"));
}

/// Without an Amount column the id column is not needed.
#[test]
fn missing_both_amount_and_id_is_not_an_error() {
    let table = Table::from_rows(&["Txn", "Date"], &[&["T1", "2023-01-01"]]).unwrap();
    assert!(detector().detect_risks(&table).unwrap().is_empty());
}

/// An empty batch yields an empty report.
#[test]
fn empty_batch() {
    assert!(detector().detect_risks(&batch(&[])).unwrap().is_empty());
}

/// An unparseable date drops that record from the rapid check only.
#[test]
fn bad_date_isolated_to_its_record() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TX1", "6000", "2023-01-01T00:00:00"],
            &["TX2", "50000", "someday"],
            &["TX3", "6000", "2023-01-01T00:30:00"],
        ]))
        .unwrap();
    assert_eq!(report.high_risk, vec!["TX2"], "bad date must not hide a large amount");
    assert_eq!(report.suspicious, vec!["TX3"], "TX3 follows TX1, not the undated TX2");
}

/// An unparseable amount drops that record from both checks but it still
/// anchors the rapid window for its successor.
#[test]
fn bad_amount_isolated_to_its_record() {
    let report = detector()
        .detect_risks(&batch(&[
            &["TX1", "lots", "2023-01-01T00:00:00"],
            &["TX2", "6000", "2023-01-01T00:10:00"],
        ]))
        .unwrap();
    assert!(report.high_risk.is_empty());
    assert_eq!(report.suspicious, vec!["TX2"]);
}

/// Duplicate ids violate the batch invariant.
#[test]
fn duplicate_transaction_id_rejected() {
    let err = detector()
        .detect_risks(&batch(&[
            &["TX1", "100", "2023-01-01"],
            &["TX1", "200", "2023-01-02"],
        ]))
        .unwrap_err();
    assert!(matches!(err, ComplianceError::DuplicateTransactionId { transaction_id } if transaction_id == "TX1"));
}

/// A table deserialized without going through `Table::new` is still shape-checked.
#[test]
fn ragged_rows_rejected() {
    let table = Table {
        columns: vec!["Transaction_ID".into(), "Amount".into()],
        rows:    vec![vec!["TX1".into()]],
    };
    assert!(matches!(
        detector().detect_risks(&table),
        Err(ComplianceError::RaggedRow { .. })
    ));
}

/// Thresholds come from the injected rules, not from constants.
#[test]
fn custom_rules_respected() {
    let detector = RiskDetector::new(AmlRules {
        aml_threshold:        dec!(100),
        rapid_window_seconds: 60,
        rapid_amount_floor:   dec!(10),
    });
    let report = detector
        .detect_risks(&batch(&[
            &["TX1", "150", "2023-01-01T00:00:00"],
            &["TX2", "50", "2023-01-01T00:00:30"],
            &["TX3", "50", "2023-01-01T00:05:00"],
        ]))
        .unwrap();
    assert_eq!(report.high_risk, vec!["TX1"]);
    assert_eq!(report.suspicious, vec!["TX2"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

fn arb_batch() -> impl Strategy<Value = Vec<(u32, i64)>> {
    // (amount, minutes after 2023-01-01T00:00:00)
    prop::collection::vec((0u32..30_000, 0i64..600), 0..40)
}

fn to_table(records: &[(u32, i64)]) -> Table {
    let base = chrono::NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let rows = records
        .iter()
        .enumerate()
        .map(|(i, (amount, minutes))| {
            let ts = base + chrono::Duration::minutes(*minutes);
            vec![
                format!("TX{i}"),
                amount.to_string(),
                ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
            ]
        })
        .collect();
    Table::new(
        vec!["Transaction_ID".into(), "Amount".into(), "Date".into()],
        rows,
    )
    .unwrap()
}

proptest! {
    /// Every high-risk id has an amount above the threshold, and every such amount is flagged.
    #[test]
    fn high_risk_matches_threshold(records in arb_batch()) {
        let report = detector().detect_risks(&to_table(&records)).unwrap();
        let expected: Vec<String> = records
            .iter()
            .enumerate()
            .filter(|(_, (amount, _))| *amount > 10_000)
            .map(|(i, _)| format!("TX{i}"))
            .collect();
        prop_assert_eq!(report.high_risk, expected);
    }

    /// The earliest-dated record (first among ties) is never suspicious.
    #[test]
    fn earliest_record_never_suspicious(records in arb_batch()) {
        prop_assume!(!records.is_empty());
        let report = detector().detect_risks(&to_table(&records)).unwrap();
        let earliest = records
            .iter()
            .enumerate()
            .min_by_key(|(i, (_, minutes))| (*minutes, *i))
            .map(|(i, _)| format!("TX{i}"))
            .unwrap();
        prop_assert!(!report.suspicious.contains(&earliest));
    }

    /// Same input, same policy, same report.
    #[test]
    fn detection_is_deterministic(records in arb_batch()) {
        let table = to_table(&records);
        let detector = detector();
        prop_assert_eq!(detector.detect_risks(&table).unwrap(), detector.detect_risks(&table).unwrap());
    }
}
