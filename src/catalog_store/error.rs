use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::models::EntityKind;
use super::validation::ValidationError;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors produced by the catalog store, the journal and the history controller.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("history entry '{0}' not found")]
    HistoryEntryNotFound(String),

    #[error("cannot {action} history entry '{id}': {reason}")]
    InvalidTransition {
        action: &'static str,
        id: String,
        reason: String,
    },

    #[error("snapshot '{0}' not found")]
    SnapshotNotFound(String),

    #[error("snapshot '{0}' failed checksum verification")]
    SnapshotCorrupted(String),
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(kind: EntityKind, id: &str) -> Self {
        CatalogError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }

    /// The individual violations of a `Validation` error, empty otherwise.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            CatalogError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
