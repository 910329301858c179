use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl SQLError {
    /// Whether this error is a UNIQUE constraint violation.
    ///
    /// Callers use this to implement insert-then-refetch on racy
    /// first-writer-wins paths (e.g. lazy user provisioning).
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, SQLError::Constraint(msg) if msg.contains("UNIQUE"))
    }
}
