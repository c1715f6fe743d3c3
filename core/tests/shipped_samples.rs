//! Integration tests over the sample inputs shipped in data/samples.
//!
//! Tests verify:
//! 1. The sample transaction batch flags the expected ids under the shipped policy
//! 2. The sample data product deserialises (including alternate field names and
//!    rule objects) and yields its known issues in order
//! 3. The sample product passes the structure audit

use bankgen_core::{
    pii::PiiExposureChecker, product::DataProduct, ComplianceChecker, PolicyConfig,
    RiskDetector, Table,
};
use std::path::{Path, PathBuf};

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../data")
}

fn shipped_policy() -> PolicyConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    PolicyConfig::load(data_dir()).unwrap()
}

fn sample_product() -> DataProduct {
    let content = std::fs::read_to_string(data_dir().join("samples/customer_360.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

/// TX1 is large; TX3 lands 30 minutes after TX2 above the floor; TX4's bad date is isolated.
#[test]
fn sample_transactions_flag_expected_ids() {
    let policy = shipped_policy();
    let table = Table::from_csv_path(data_dir().join("samples/transactions.csv")).unwrap();

    let report = RiskDetector::from_policy(&policy).detect_risks(&table).unwrap();
    assert_eq!(report.high_risk, vec!["TX1"]);
    assert_eq!(report.suspicious, vec!["TX3"]);

    assert!(!PiiExposureChecker::from_policy(&policy).has_pii_exposure(&table.columns));
}

// ─────────────────────────────────────────────────────────────────────────────
// Data product
// ─────────────────────────────────────────────────────────────────────────────

/// The email attribute uses attribute_name / attribute_type and a rule object.
#[test]
fn sample_product_reads_alternate_field_names() {
    let product = sample_product();
    let email = product.attribute("email").expect("email attribute");
    assert!(email.is_pii);
    assert!(email.has_rule("format_check"));
    assert!(email.has_rule("masking"));
}

/// Known gaps: email lacks encryption, balance lacks precision and a source mapping.
#[test]
fn sample_product_issues_in_order() {
    let checker = ComplianceChecker::from_policy(&shipped_policy());
    let result = checker.validate_data_product(&sample_product()).unwrap();

    assert!(!result.is_valid);
    assert_eq!(
        result.issues,
        vec![
            "PII attribute email missing encryption rule",
            "Attribute balance missing precision rule",
            "Attribute balance missing source system mapping",
        ]
    );
    assert_eq!(result.recommendations.len(), 3);
}

/// Every mapped attribute points at a declared system with a source field.
#[test]
fn sample_product_passes_audit() {
    let checker = ComplianceChecker::from_policy(&shipped_policy());
    let report = checker.audit_structure(&sample_product());
    assert!(report.valid, "findings: {:?}", report.findings);
}
