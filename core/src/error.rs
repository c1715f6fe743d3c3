use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("Policy configuration error in {source_path}: {reason}")]
    PolicyConfiguration { source_path: String, reason: String },

    #[error("Malformed record at row {row}, column '{column}' (value {value:?}): {reason}")]
    MalformedRecord {
        row:    usize,
        column: String,
        value:  String,
        reason: String,
    },

    #[error("Row {row} has {actual} cells, header has {expected}")]
    RaggedRow { row: usize, expected: usize, actual: usize },

    #[error("Duplicate transaction id '{transaction_id}' in batch")]
    DuplicateTransactionId { transaction_id: String },

    #[error("Duplicate attribute '{name}' in data product")]
    DuplicateAttribute { name: String },

    #[error("Column '{column}' not found")]
    MissingColumn { column: String },

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComplianceError {
    pub(crate) fn policy(source_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PolicyConfiguration {
            source_path: source_path.into(),
            reason:      reason.into(),
        }
    }
}

pub type ComplianceResult<T> = Result<T, ComplianceError>;
