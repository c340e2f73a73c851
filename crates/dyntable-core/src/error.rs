use thiserror::Error;

use crate::enums::TableType;

/// Engine error type shared across dyntable crates.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Malformed input, rejected before any store access.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The entity does not exist, or exists but is not visible to the caller.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// The entity resolved but the caller lacks ownership, admin role, or
    /// token scope.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// Structural change blocked by the table's commerce type.
    #[error(
        "column '{column}' is protected while the table type is '{table_type}'; \
         change the table type first"
    )]
    ColumnProtected { column: String, table_type: TableType },
    /// Unique-name constraint translated to a domain error.
    #[error("column name '{name}' is already in use on this table")]
    DuplicateColumnName { name: String },
    /// Storage layer or adapter failure.
    #[error("storage error: {0}")]
    Storage(String),
    /// Catch-all for unexpected failures; logged with context at the site.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Shorthand for a `NotFound` over a uuid-keyed entity.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Convenience alias for results returned by dyntable crates.
pub type Result<T> = std::result::Result<T, Error>;
