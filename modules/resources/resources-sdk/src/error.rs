//! Resource store error types.
//!
//! Transport-agnostic error definitions shared by all store implementations.

use thiserror::Error;

/// Error type for resource store operations.
///
/// Not-found and boundary outcomes are not errors: they surface as `None`
/// or `false` from the store methods.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A concurrent reorder changed one of the swapped rows between read and write.
    #[error("concurrent reorder detected for resource {id}")]
    ReorderConflict { id: i32 },

    /// The backend rejected or failed a statement.
    #[error("database error: {message}")]
    Database { message: String },
}

impl ResourceError {
    /// Creates a `Database` error from any displayable backend error.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}
