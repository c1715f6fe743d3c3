//! Data product compliance checking.
//!
//! Per attribute, in attribute order:
//!   1. PII handling   — encryption and masking rule tags
//!   2. Required field — not_null rule tag
//!   3. Data quality   — format_check tag on strings, then catalog rules
//! Then, for every attribute, the source-system mapping.
//!
//! A failed check is returned as data (`is_valid == false` plus one issue and
//! one recommendation per finding), never as an error.

use crate::{
    config::{ComplianceRules, PolicyConfig},
    error::ComplianceResult,
    product::{Attribute, AttributeType, DataProduct, SourceMapping},
    types::RuleTag,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// ── Results ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid:        bool,
    pub issues:          Vec<String>,
    /// `recommendations[i]` remedies `issues[i]`.
    pub recommendations: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { is_valid: true, issues: Vec::new(), recommendations: Vec::new() }
    }

    /// A new result holding both sets of findings, `self` first.
    pub fn merged(&self, other: &ValidationResult) -> ValidationResult {
        let mut findings = Findings::default();
        findings.extend_from(self);
        findings.extend_from(other);
        findings.finish()
    }
}

/// Accumulates issue/recommendation pairs; the only way results are built.
#[derive(Debug, Default)]
struct Findings {
    issues:          Vec<String>,
    recommendations: Vec<String>,
}

impl Findings {
    fn flag(&mut self, issue: String, recommendation: String) {
        self.issues.push(issue);
        self.recommendations.push(recommendation);
    }

    fn extend_from(&mut self, result: &ValidationResult) {
        self.issues.extend(result.issues.iter().cloned());
        self.recommendations.extend(result.recommendations.iter().cloned());
    }

    fn finish(self) -> ValidationResult {
        ValidationResult {
            is_valid:        self.issues.is_empty(),
            issues:          self.issues,
            recommendations: self.recommendations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub valid:    bool,
    pub findings: Vec<Finding>,
}

// ── Checker ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ComplianceChecker {
    rules: ComplianceRules,
}

impl ComplianceChecker {
    pub fn new(rules: ComplianceRules) -> Self {
        Self { rules }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.compliance.clone())
    }

    /// Validate every attribute of `product` against policy.
    ///
    /// Errors only when the product itself is malformed (duplicate attribute
    /// names). An empty attribute list is vacuously compliant.
    pub fn validate_data_product(&self, product: &DataProduct) -> ComplianceResult<ValidationResult> {
        product.check_structure()?;
        let mut findings = Findings::default();

        for attr in &product.attributes {
            self.check_pii_handling(attr, &mut findings);
            self.check_data_quality(attr, &mut findings);
        }
        for attr in &product.attributes {
            if !attr.is_mapped() {
                findings.flag(
                    format!("Attribute {} missing source system mapping", attr.name),
                    format!("Map attribute {} to appropriate source system", attr.name),
                );
            }
        }

        let result = findings.finish();
        if result.is_valid {
            log::debug!("data product '{}' compliant", product.product_id);
        } else {
            log::warn!(
                "data product '{}' failed validation with {} issues",
                product.product_id,
                result.issues.len()
            );
        }
        Ok(result)
    }

    fn check_pii_handling(&self, attr: &Attribute, findings: &mut Findings) {
        if !attr.is_pii {
            return;
        }
        let handling = &self.rules.pii_handling;
        for tag in [&handling.encryption_rule, &handling.masking_rule] {
            if !attr.has_rule(tag) {
                findings.flag(
                    format!("PII attribute {} missing {} rule", attr.name, tag),
                    format!("Add {} rule to protect PII attribute {}", tag, attr.name),
                );
            }
        }
    }

    fn check_data_quality(&self, attr: &Attribute, findings: &mut Findings) {
        let required = &self.rules.required_rule;
        if attr.is_required && !attr.has_rule(required) {
            findings.flag(
                format!("Required attribute {} missing {} rule", attr.name, required),
                format!("Add {} rule for required field {}", required, attr.name),
            );
        }

        let format = &self.rules.format_rule;
        if attr.attribute_type == AttributeType::String && !attr.has_rule(format) {
            findings.flag(
                format!("String attribute {} missing {} rule", attr.name, format),
                format!("Add {} rule for {}", format, attr.name),
            );
        }

        for rule in self.catalog_rules(attr) {
            if !attr.has_rule(&rule) {
                findings.flag(
                    format!("Attribute {} missing {} rule", attr.name, rule),
                    format!("Add {} rule for {}", rule, attr.name),
                );
            }
        }
    }

    /// Catalog rules required for this attribute, in configured order.
    fn catalog_rules(&self, attr: &Attribute) -> Vec<RuleTag> {
        self.rules
            .data_quality_catalog
            .get(&attr.name.to_lowercase())
            .map(|entry| {
                entry
                    .iter()
                    .filter(|(_, requirement)| requirement.is_required())
                    .map(|(rule, _)| rule.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rule tags this attribute needs to clear every per-attribute check.
    pub fn recommended_rules(&self, attr: &Attribute) -> BTreeSet<RuleTag> {
        let mut rules = BTreeSet::new();
        if attr.is_pii {
            rules.insert(self.rules.pii_handling.encryption_rule.clone());
            rules.insert(self.rules.pii_handling.masking_rule.clone());
        }
        if attr.is_required {
            rules.insert(self.rules.required_rule.clone());
        }
        if attr.attribute_type == AttributeType::String {
            rules.insert(self.rules.format_rule.clone());
        }
        rules.extend(self.catalog_rules(attr));
        rules
    }

    /// Completeness review of the product description itself.
    pub fn audit_structure(&self, product: &DataProduct) -> AuditReport {
        let mut findings = Vec::new();
        let mut push = |severity, message: String| findings.push(Finding { severity, message });

        if product.refresh_frequency.trim().is_empty() {
            push(Severity::High, "Missing required field: refresh_frequency".into());
        }
        if product.retention_period.trim().is_empty() {
            push(Severity::Medium, "Missing retention_period".into());
        }
        if product.attributes.is_empty() {
            push(Severity::High, format!("Data product {} has no attributes", product.product_id));
        }

        let declared: HashSet<&str> = product
            .source_systems
            .iter()
            .flat_map(|s| [s.system_id.as_str(), s.system_name.as_str()])
            .collect();
        for attr in product.attributes.iter().filter(|a| a.is_mapped()) {
            if !declared.contains(attr.source_system.as_str()) {
                push(
                    Severity::Medium,
                    format!(
                        "Attribute {} maps to undeclared source system {}",
                        attr.name, attr.source_system
                    ),
                );
            }
            if attr.source_field.trim().is_empty() {
                push(
                    Severity::Medium,
                    format!("Attribute {} missing source field in {}", attr.name, attr.source_system),
                );
            }
        }

        AuditReport { valid: findings.is_empty(), findings }
    }

    /// Check source-to-target mappings, in mapping order.
    pub fn validate_mappings(&self, product: &DataProduct, mappings: &[SourceMapping]) -> ValidationResult {
        let mut findings = Findings::default();
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

        for (i, mapping) in mappings.iter().enumerate() {
            if blank(&mapping.source_attribute) {
                findings.flag(
                    format!("Mapping {} from {} missing source_attribute", i, mapping.source_system),
                    format!("Specify the source attribute for mapping {i}"),
                );
            }
            match mapping.target_attribute.as_deref().map(str::trim) {
                None | Some("") => findings.flag(
                    format!("Mapping {} from {} missing target_attribute", i, mapping.source_system),
                    format!("Specify the target attribute for mapping {i}"),
                ),
                Some(target) if product.attribute(target).is_none() => findings.flag(
                    format!("Mapping {i} targets unknown attribute {target}"),
                    format!("Add attribute {target} to the data product or correct mapping {i}"),
                ),
                Some(_) => {}
            }
        }
        findings.finish()
    }
}
