//! Error taxonomy for provenance operations

use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the node registry, relation ledger and batch ingestion
#[derive(Debug, Error)]
pub enum ProvError {
    /// A referenced label does not resolve to an existing node
    #[error("Node not found: {0}")]
    NotFound(String),

    /// A batch references a label that is neither in the batch nor stored
    #[error("Unresolved reference in batch: {label}")]
    Reference { label: String },

    /// A node type or verb outside the recognised vocabulary
    #[error("Invalid {kind}: {value}")]
    InvalidEnum { kind: &'static str, value: String },

    /// The store is unreachable or a transaction could not commit
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl ProvError {
    /// The offending label for `NotFound` and `Reference` errors.
    pub fn label(&self) -> Option<&str> {
        match self {
            ProvError::NotFound(label) | ProvError::Reference { label } => Some(label),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ProvError {
    fn from(e: rusqlite::Error) -> Self {
        ProvError::Storage(StorageError::Database(e))
    }
}

/// Result type for provenance operations
pub type ProvResult<T> = Result<T, ProvError>;
