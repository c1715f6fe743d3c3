//! Shared primitive types used across the compliance core.

/// Identifier of a transaction, unique within one evaluation batch.
pub type TransactionId = String;

/// Name of a data product attribute, unique within that product.
pub type AttributeName = String;

/// Name of a data quality rule tag, e.g. `not_null` or `encryption`.
pub type RuleTag = String;
