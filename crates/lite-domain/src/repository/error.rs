//! Repository Errors
//!
//! One taxonomy shared by every backend. "Not found" is deliberately absent:
//! a missing entity is `Ok(None)` / `Ok(false)`, never an error.

/// Errors that can occur during repository operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The id's textual form cannot be used as a storage key
    InvalidId { id: String, reason: String },
    /// Filesystem operation failed
    Io {
        path: String,
        kind: std::io::ErrorKind,
        message: String,
    },
    /// The document store client reported a failure
    Transport { message: String },
    /// The entity could not be serialized
    Encode { id: String, message: String },
    /// Stored content could not be parsed into the entity type
    Decode { key: String, message: String },
    /// Some entities of a batch were not saved
    PartialBatch {
        /// Ids that were persisted, in input order
        saved: Vec<String>,
        failures: Vec<BatchFailure>,
    },
    /// The repository is configured not to support this operation
    Unsupported { operation: String },
    /// A deferred result was dropped before it was resolved
    Abandoned,
}

/// A single entity that failed inside a batch write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: String,
    pub error: RepositoryError,
}

impl RepositoryError {
    /// Build an `Io` error from a std I/O error and the path involved
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        RepositoryError::Io {
            path: path.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// True for failures of the underlying store (filesystem or database)
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            RepositoryError::Io { .. } | RepositoryError::Transport { .. }
        )
    }

    /// True for failures converting between entities and stored content
    pub fn is_serialization_failure(&self) -> bool {
        matches!(
            self,
            RepositoryError::Encode { .. } | RepositoryError::Decode { .. }
        )
    }
}

impl core::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RepositoryError::InvalidId { id, reason } => {
                write!(f, "Invalid id '{}': {}", id, reason)
            }
            RepositoryError::Io { path, message, .. } => {
                write!(f, "I/O error on {}: {}", path, message)
            }
            RepositoryError::Transport { message } => {
                write!(f, "Document store error: {}", message)
            }
            RepositoryError::Encode { id, message } => {
                write!(f, "Failed to encode entity '{}': {}", id, message)
            }
            RepositoryError::Decode { key, message } => {
                write!(f, "Failed to decode '{}': {}", key, message)
            }
            RepositoryError::PartialBatch { saved, failures } => {
                let failed: Vec<&str> = failures.iter().map(|fail| fail.id.as_str()).collect();
                write!(
                    f,
                    "Batch partially saved ({} saved, {} failed: {})",
                    saved.len(),
                    failures.len(),
                    failed.join(", ")
                )
            }
            RepositoryError::Unsupported { operation } => {
                write!(f, "Operation not supported by this repository: {}", operation)
            }
            RepositoryError::Abandoned => {
                write!(f, "Deferred result was dropped before completion")
            }
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Result alias used by every repository contract
pub type RepositoryResult<T> = Result<T, RepositoryError>;
