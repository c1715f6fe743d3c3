//! compliance-runner: headless front end for the compliance core.
//!
//! Usage:
//!   compliance-runner --data-dir ./data --transactions tx.csv --product dp.json --sql "SELECT ..."
//!   compliance-runner --data-dir ./data --ipc-mode

use anyhow::{Context, Result};
use bankgen_core::{
    compliance::{AuditReport, ComplianceChecker, ValidationResult},
    pii::{PiiExposureChecker, PiiFinding, PiiScanner},
    product::DataProduct,
    risk::{RiskDetector, RiskReport},
    sql_guard::{QueryScreening, SqlSafetyChecker},
    PolicyConfig, Table,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    DetectRisks { table: Table },
    CheckColumns { columns: Vec<String> },
    CheckSql { query: String },
    ValidateProduct { product: DataProduct },
    AuditProduct { product: DataProduct },
    Quit,
}

#[derive(serde::Serialize, Default)]
struct OneShotReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    risks: Option<RiskReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pii_exposure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pii_values: Option<Vec<PiiFinding>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<QueryScreening>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audit: Option<AuditReport>,
}

/// Components built once from the loaded policy.
struct Checks {
    risk:       RiskDetector,
    exposure:   PiiExposureChecker,
    scanner:    PiiScanner,
    sql:        SqlSafetyChecker,
    compliance: ComplianceChecker,
}

impl Checks {
    fn build(policy: &PolicyConfig) -> Result<Self> {
        Ok(Self {
            risk:       RiskDetector::from_policy(policy),
            exposure:   PiiExposureChecker::from_policy(policy),
            scanner:    PiiScanner::new()?,
            sql:        SqlSafetyChecker::from_policy(policy),
            compliance: ComplianceChecker::from_policy(policy),
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");

    let policy = PolicyConfig::load(data_dir)
        .with_context(|| format!("loading policy from {data_dir}"))?;
    let checks = Checks::build(&policy)?;

    if ipc_mode {
        run_ipc_loop(&checks)
    } else {
        let report = run_once(&checks, &args)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

fn run_once(checks: &Checks, args: &[String]) -> Result<OneShotReport> {
    let mut report = OneShotReport::default();

    if let Some(path) = arg_value(args, "--transactions") {
        let table = Table::from_csv_path(path).with_context(|| format!("reading {path}"))?;
        report.risks = Some(checks.risk.detect_risks(&table)?);
        report.pii_exposure = Some(checks.exposure.has_pii_exposure(&table.columns));
        report.pii_values = Some(checks.scanner.scan(&table));
    }

    if let Some(query) = arg_value(args, "--sql") {
        report.query = Some(checks.sql.screen(query));
    }

    if let Some(path) = arg_value(args, "--product") {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let product: DataProduct = serde_json::from_str(&content)?;
        report.validation = Some(checks.compliance.validate_data_product(&product)?);
        report.audit = Some(checks.compliance.audit_structure(&product));
    }

    Ok(report)
}

fn run_ipc_loop(checks: &Checks) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::DetectRisks { table } => {
                checks.risk.detect_risks(&table).map(|r| serde_json::to_value(r))
            }
            IpcCommand::CheckColumns { columns } => Ok(serde_json::to_value(serde_json::json!({
                "has_pii_exposure": checks.exposure.has_pii_exposure(&columns),
                "exposed_columns": checks.exposure.exposed_columns(&columns),
            }))),
            IpcCommand::CheckSql { query } => Ok(serde_json::to_value(checks.sql.screen(&query))),
            IpcCommand::ValidateProduct { product } => checks
                .compliance
                .validate_data_product(&product)
                .map(|r| serde_json::to_value(r)),
            IpcCommand::AuditProduct { product } => {
                Ok(serde_json::to_value(checks.compliance.audit_structure(&product)))
            }
        };

        // Structural input errors go back to the client; the loop keeps serving.
        match response {
            Ok(value) => writeln!(stdout, "{}", value?)?,
            Err(e) => {
                log::warn!("command rejected: {e}");
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
