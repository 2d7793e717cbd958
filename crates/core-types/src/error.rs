use thiserror::Error;

/// Validation failures detected before a request ever reaches the database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unsupported operator: {0}")]
    InvalidOperator(String),

    #[error("Unknown charity attribute: {0}")]
    InvalidAttribute(String),

    #[error("Unsupported logical operator: {0}")]
    InvalidConnector(String),

    #[error("Expected {expected} logical operator(s) for the given conditions, got {actual}")]
    InvalidConnectorCount { expected: usize, actual: usize },

    #[error("Value {value:?} is not valid for attribute {attribute}")]
    InvalidValue { attribute: String, value: String },

    #[error("No attributes selected")]
    EmptyProjection,
}
