//! Data product description: attributes, source systems and mappings.

use crate::{
    error::{ComplianceError, ComplianceResult},
    types::{AttributeName, RuleTag},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProductType {
    #[default]
    #[serde(rename = "customer_360")]
    Customer360,
    Transaction,
    Behavioral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(alias = "attribute_name")]
    pub name: AttributeName,
    #[serde(rename = "type", alias = "attribute_type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_pii: bool,
    #[serde(default = "default_true")]
    pub is_required: bool,
    /// Empty means unmapped.
    #[serde(default)]
    pub source_system: String,
    #[serde(default)]
    pub source_field: String,
    #[serde(default)]
    pub transformation_rule: Option<String>,
    #[serde(default, deserialize_with = "rule_tags")]
    pub data_quality_rules: BTreeSet<RuleTag>,
}

fn default_true() -> bool {
    true
}

/// Rule tags arrive either as bare names or as rule objects carrying a
/// `rule_name`; only the name matters here.
fn rule_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<RuleTag>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagRepr {
        Tag(String),
        Rule { rule_name: String },
    }

    let raw = Vec::<TagRepr>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|r| match r {
            TagRepr::Tag(name) | TagRepr::Rule { rule_name: name } => name,
        })
        .collect())
}

impl Attribute {
    /// Unmapped, not PII, not required, no rules.
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            description: String::new(),
            is_pii: false,
            is_required: false,
            source_system: String::new(),
            source_field: String::new(),
            transformation_rule: None,
            data_quality_rules: BTreeSet::new(),
        }
    }

    pub fn pii(mut self) -> Self {
        self.is_pii = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn sourced_from(mut self, system: impl Into<String>, field: impl Into<String>) -> Self {
        self.source_system = system.into();
        self.source_field = field.into();
        self
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_quality_rules.extend(rules.into_iter().map(Into::into));
        self
    }

    pub fn has_rule(&self, tag: &str) -> bool {
        self.data_quality_rules.contains(tag)
    }

    pub fn is_mapped(&self) -> bool {
        !self.source_system.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSystem {
    pub system_id:   String,
    pub system_name: String,
    #[serde(default)]
    pub system_type: String,
    #[serde(default)]
    pub connection_details: BTreeMap<String, String>,
}

/// One source-to-target field mapping. Fields are optional because
/// designers submit partial mappings; validation reports the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub source_system: String,
    #[serde(default)]
    pub source_attribute: Option<String>,
    #[serde(default)]
    pub target_attribute: Option<String>,
    #[serde(default)]
    pub transformation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProduct {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_type: DataProductType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub source_systems: Vec<SourceSystem>,
    #[serde(default)]
    pub refresh_frequency: String,
    #[serde(default)]
    pub retention_period: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "draft".into()
}

impl DataProduct {
    pub fn new(product_id: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            status: default_status(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attribute names must be unique within a product.
    pub fn check_structure(&self) -> ComplianceResult<()> {
        let mut seen = HashSet::with_capacity(self.attributes.len());
        for attr in &self.attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(ComplianceError::DuplicateAttribute { name: attr.name.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_accepts_rule_objects_and_tags() {
        let json = r#"{
            "attribute_name": "email",
            "attribute_type": "string",
            "is_pii": true,
            "source_system": "crm",
            "data_quality_rules": ["masking", {"rule_name": "encryption", "severity": "error"}]
        }"#;
        let attr: Attribute = serde_json::from_str(json).unwrap();
        assert_eq!(attr.name, "email");
        assert!(attr.is_required);
        assert!(attr.has_rule("masking"));
        assert!(attr.has_rule("encryption"));
    }

    #[test]
    fn duplicate_attribute_names_rejected() {
        let product = DataProduct::new("DP001", "Customer 360")
            .with_attribute(Attribute::new("tier", AttributeType::String))
            .with_attribute(Attribute::new("tier", AttributeType::Integer));
        assert!(matches!(
            product.check_structure(),
            Err(ComplianceError::DuplicateAttribute { .. })
        ));
    }
}
