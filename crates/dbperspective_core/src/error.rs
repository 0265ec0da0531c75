use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerspectiveError {
    #[error("Schema inconsistency: {0}")]
    SchemaInconsistency(String),

    #[error("Invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Invalid perspective config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
