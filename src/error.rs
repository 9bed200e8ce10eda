use thiserror::Error;

/// Failures surfaced by the study core.
///
/// Application edges (database, CLI, settings) keep using `anyhow`; this enum
/// is what callers of the reader components match on.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Rejected input: nothing was mutated.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The storage collaborator failed. Optimistic in-memory state is kept.
    #[error("persistence failed during {operation}: {reason}")]
    PersistenceFailure { operation: String, reason: String },
    #[error("focus tracker misuse: {0}")]
    TrackerMisuse(String),
    #[error("session flush failed: {0}")]
    SessionFlush(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl StudyError {
    pub fn persistence(operation: &str, err: anyhow::Error) -> Self {
        StudyError::PersistenceFailure {
            operation: operation.to_string(),
            reason: format!("{err:#}"),
        }
    }
}

pub type StudyResult<T> = std::result::Result<T, StudyError>;
