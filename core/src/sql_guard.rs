//! Denylist screening for generated SQL.
//!
//! Matching is plain substring containment on the uppercased query, not a
//! token match: a column called `updated_at` trips `UPDATE`. Callers get the
//! false positive; it is not filtered out here.

use crate::config::{FieldRules, PolicyConfig};
use serde::{Deserialize, Serialize};

/// Checked in addition to the policy denylist. Compared uppercased.
pub const INJECTION_MARKERS: &[&str] = &[";--", "XP_", "EXEC"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryScreening {
    pub is_safe:                 bool,
    pub blocked_keywords:        Vec<String>,
    pub injection_markers:       Vec<String>,
    pub restricted_terms:        Vec<String>,
    pub missing_required_fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SqlSafetyChecker {
    blacklist:        Vec<String>,
    restricted_terms: Vec<String>,
    required_fields:  Vec<String>,
}

impl SqlSafetyChecker {
    pub fn new(rules: &FieldRules) -> Self {
        Self {
            blacklist:        rules.sql_blacklist.iter().map(|k| k.to_uppercase()).collect(),
            restricted_terms: rules.restricted_query_terms.iter().map(|t| t.to_lowercase()).collect(),
            required_fields:  rules.required_fields.clone(),
        }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(&policy.fields)
    }

    /// False iff the query contains a denylisted keyword or injection marker.
    pub fn is_sql_safe(&self, query: &str) -> bool {
        let upper = query.to_uppercase();
        let unsafe_hit = self
            .blacklist
            .iter()
            .map(String::as_str)
            .chain(INJECTION_MARKERS.iter().copied())
            .find(|needle| upper.contains(*needle));

        if let Some(needle) = unsafe_hit {
            log::warn!("query rejected: contains '{needle}'");
            return false;
        }
        true
    }

    /// Denylisted keywords present in the query, in policy order.
    pub fn blocked_keywords(&self, query: &str) -> Vec<String> {
        let upper = query.to_uppercase();
        self.blacklist.iter().filter(|k| upper.contains(k.as_str())).cloned().collect()
    }

    pub fn injection_markers(&self, query: &str) -> Vec<String> {
        let upper = query.to_uppercase();
        INJECTION_MARKERS
            .iter()
            .filter(|m| upper.contains(**m))
            .map(|m| m.to_string())
            .collect()
    }

    /// Sensitive terms (e.g. `ssn`, `password`) the query references.
    pub fn restricted_terms(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        self.restricted_terms.iter().filter(|t| lower.contains(t.as_str())).cloned().collect()
    }

    /// Required fields whose lowercase name does not occur anywhere in the
    /// lowercased query. Substring containment, so `tier` is satisfied by
    /// `customer_tier`.
    pub fn missing_required_fields(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        self.required_fields
            .iter()
            .filter(|f| !lower.contains(&f.to_lowercase()))
            .cloned()
            .collect()
    }

    pub fn screen(&self, query: &str) -> QueryScreening {
        let screening = QueryScreening {
            is_safe:                 self.is_sql_safe(query),
            blocked_keywords:        self.blocked_keywords(query),
            injection_markers:       self.injection_markers(query),
            restricted_terms:        self.restricted_terms(query),
            missing_required_fields: self.missing_required_fields(query),
        };
        log::debug!(
            "query screened: safe={} restricted={} missing_required={}",
            screening.is_safe,
            screening.restricted_terms.len(),
            screening.missing_required_fields.len()
        );
        screening
    }
}
