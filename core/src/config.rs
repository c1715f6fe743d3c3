//! Policy configuration — loaded once at start, immutable afterwards.
//!
//! Layout under the data directory:
//!   policy/aml_rules.json         thresholds for the risk detector
//!   policy/field_rules.json       field lists, SQL denylist, format patterns
//!   policy/compliance_rules.json  rule tags and the data quality catalog

use crate::error::{ComplianceError, ComplianceResult};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{
    de::{DeserializeOwned, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

const AML_RULES_FILE: &str = "policy/aml_rules.json";
const FIELD_RULES_FILE: &str = "policy/field_rules.json";
const COMPLIANCE_RULES_FILE: &str = "policy/compliance_rules.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmlRules {
    /// Amounts strictly above this are high risk.
    pub aml_threshold:        Decimal,
    pub rapid_window_seconds: i64,
    pub rapid_amount_floor:   Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldRules {
    pub required_fields: Vec<String>,
    pub pii_field_names: Vec<String>,
    /// Uppercase keywords; any occurrence in a query makes it unsafe.
    pub sql_blacklist:   Vec<String>,
    #[serde(default)]
    pub restricted_query_terms: Vec<String>,
    /// Lowercase column name -> regex every value of that column must match.
    #[serde(default)]
    pub format_rules: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PiiHandlingRules {
    pub encryption_rule: String,
    pub masking_rule:    String,
}

/// One entry of the data quality catalog.
///
/// The catalog mixes switches (`"not_null": true`) with parameters
/// (`"precision": "18,2"`). A parameter counts as required when non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RuleRequirement {
    Flag(bool),
    Parameter(String),
}

impl RuleRequirement {
    pub fn is_required(&self) -> bool {
        match self {
            RuleRequirement::Flag(on)     => *on,
            RuleRequirement::Parameter(p) => !p.trim().is_empty(),
        }
    }
}

/// Rule requirements for one catalog attribute, kept in the order the policy
/// file lists them. Issues for missing catalog rules are emitted in this order.
///
/// A rule named twice keeps its first position and its last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogEntry(Vec<(String, RuleRequirement)>);

impl CatalogEntry {
    pub fn insert(&mut self, rule: impl Into<String>, requirement: RuleRequirement) {
        let rule = rule.into();
        match self.0.iter_mut().find(|(name, _)| *name == rule) {
            Some((_, slot)) => *slot = requirement,
            None => self.0.push((rule, requirement)),
        }
    }

    pub fn get(&self, rule: &str) -> Option<&RuleRequirement> {
        self.0.iter().find(|(name, _)| name == rule).map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleRequirement)> {
        self.0.iter().map(|(name, r)| (name.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, const N: usize> From<[(K, RuleRequirement); N]> for CatalogEntry {
    fn from(rules: [(K, RuleRequirement); N]) -> Self {
        let mut entry = CatalogEntry::default();
        for (rule, requirement) in rules {
            entry.insert(rule, requirement);
        }
        entry
    }
}

impl Serialize for CatalogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for CatalogEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = CatalogEntry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of rule name to requirement")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entry = CatalogEntry::default();
                while let Some((rule, requirement)) = map.next_entry::<String, RuleRequirement>()? {
                    entry.insert(rule, requirement);
                }
                Ok(entry)
            }
        }

        deserializer.deserialize_map(EntryVisitor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceRules {
    pub pii_handling:  PiiHandlingRules,
    pub required_rule: String,
    pub format_rule:   String,
    /// Lowercase attribute name -> rules in configured order.
    #[serde(default)]
    pub data_quality_catalog: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
    pub aml:        AmlRules,
    pub fields:     FieldRules,
    pub compliance: ComplianceRules,
}

impl PolicyConfig {
    /// Load from the data/ directory and validate.
    /// In tests, use PolicyConfig::default_test().
    pub fn load(data_dir: impl AsRef<Path>) -> ComplianceResult<Self> {
        let data_dir = data_dir.as_ref();

        let config = Self {
            aml:        read_section(&data_dir.join(AML_RULES_FILE))?,
            fields:     read_section(&data_dir.join(FIELD_RULES_FILE))?,
            compliance: read_section(&data_dir.join(COMPLIANCE_RULES_FILE))?,
        };
        config.validate(&data_dir.display().to_string())?;

        log::info!(
            "policy loaded from {}: aml_threshold={} required_fields={} blacklist={} catalog={}",
            data_dir.display(),
            config.aml.aml_threshold,
            config.fields.required_fields.len(),
            config.fields.sql_blacklist.len(),
            config.compliance.data_quality_catalog.len(),
        );
        Ok(config)
    }

    /// Reject configurations the checks cannot run against.
    pub fn validate(&self, source_path: &str) -> ComplianceResult<()> {
        let fail = |reason: String| Err(ComplianceError::policy(source_path, reason));

        if self.aml.aml_threshold.is_sign_negative() {
            return fail(format!("aml_threshold must be non-negative, got {}", self.aml.aml_threshold));
        }
        if self.aml.rapid_amount_floor.is_sign_negative() {
            return fail(format!(
                "rapid_amount_floor must be non-negative, got {}",
                self.aml.rapid_amount_floor
            ));
        }
        if self.aml.rapid_window_seconds <= 0 {
            return fail(format!(
                "rapid_window_seconds must be positive, got {}",
                self.aml.rapid_window_seconds
            ));
        }

        for keyword in &self.fields.sql_blacklist {
            if keyword.trim().is_empty() {
                return fail("sql_blacklist contains an empty keyword".into());
            }
            if keyword.to_uppercase() != *keyword {
                return fail(format!("sql_blacklist keyword '{keyword}' must be uppercase"));
            }
        }

        for (column, pattern) in &self.fields.format_rules {
            if let Err(e) = Regex::new(pattern) {
                return fail(format!("format rule for '{column}' does not compile: {e}"));
            }
        }

        let rules = &self.compliance;
        let tags = [
            ("pii_handling.encryption_rule", &rules.pii_handling.encryption_rule),
            ("pii_handling.masking_rule", &rules.pii_handling.masking_rule),
            ("required_rule", &rules.required_rule),
            ("format_rule", &rules.format_rule),
        ];
        for (key, tag) in tags {
            if tag.trim().is_empty() {
                return fail(format!("{key} must name a rule tag"));
            }
        }
        if let Some(name) = rules.data_quality_catalog.keys().find(|n| n.to_lowercase() != **n) {
            return fail(format!("data_quality_catalog key '{name}' must be lowercase"));
        }

        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        fn strs(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        let catalog = BTreeMap::from([
            (
                "balance".to_string(),
                CatalogEntry::from([
                    ("not_null", RuleRequirement::Flag(true)),
                    ("positive_value", RuleRequirement::Flag(true)),
                    ("precision", RuleRequirement::Parameter("18,2".into())),
                ]),
            ),
            (
                "transaction".to_string(),
                CatalogEntry::from([
                    ("not_null", RuleRequirement::Flag(true)),
                    ("valid_amount", RuleRequirement::Flag(true)),
                    ("valid_date", RuleRequirement::Flag(true)),
                ]),
            ),
        ]);

        Self {
            aml: AmlRules {
                aml_threshold:        Decimal::new(10_000, 0),
                rapid_window_seconds: 3600,
                rapid_amount_floor:   Decimal::new(5_000, 0),
            },
            fields: FieldRules {
                required_fields: strs(&["Customer_ID", "Tier", "Risk_Score"]),
                pii_field_names: strs(&[
                    "ssn",
                    "tax_id",
                    "passport_number",
                    "drivers_license",
                    "bank_account",
                    "credit_card",
                ]),
                sql_blacklist: strs(&[
                    "DROP", "DELETE", "UPDATE", "INSERT", "TRUNCATE", "ALTER", "CREATE", "GRANT",
                    "REVOKE",
                ]),
                restricted_query_terms: strs(&["ssn", "password", "pin"]),
                format_rules: [
                    ("email".to_string(), r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$".to_string()),
                    ("phone".to_string(), r"^\+?[1-9]\d{1,14}$".to_string()),
                    ("postal_code".to_string(), r"^[0-9]{5,10}$".to_string()),
                ]
                .into(),
            },
            compliance: ComplianceRules {
                pii_handling: PiiHandlingRules {
                    encryption_rule: "encryption".into(),
                    masking_rule:    "masking".into(),
                },
                required_rule: "not_null".into(),
                format_rule:   "format_check".into(),
                data_quality_catalog: catalog,
            },
        }
    }
}

fn read_section<T: DeserializeOwned>(path: &Path) -> ComplianceResult<T> {
    let shown = path.display().to_string();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ComplianceError::policy(&shown, format!("cannot read: {e}")))?;
    serde_json::from_str(&content).map_err(|e| ComplianceError::policy(&shown, e.to_string()))
}
