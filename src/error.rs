//! Error types for the scrub-and-defrag engine.

use thiserror::Error;

/// Result type alias for scrub operations
pub type Result<T> = std::result::Result<T, ScrubError>;

/// Errors that can occur while copying a database
#[derive(Error, Debug)]
pub enum ScrubError {
    /// I/O error from either page store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A page buffer could not be allocated
    #[error("out of memory")]
    OutOfMemory,

    /// Structural damage found while walking source pages
    #[error("{0}")]
    Corruption(String),

    /// A computed destination page number is out of range
    #[error("{0}")]
    Logic(String),

    /// Failure reported by the SQL connection layer
    #[error("{context}: {source}")]
    Sqlite {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Database file header is invalid or describes an unsupported geometry
    #[error("Invalid database file: {0}")]
    InvalidDatabaseFile(String),

    /// The destination already holds data
    #[error("destination database is not empty - holds {pages} pages")]
    DestinationNotEmpty { pages: u32 },

    /// Invalid operation for the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl ScrubError {
    /// Create a corruption error with a message
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Create a logic error with a message
    pub fn logic(msg: impl Into<String>) -> Self {
        Self::Logic(msg.into())
    }

    /// Create an invalid database file error
    pub fn invalid_db(msg: impl Into<String>) -> Self {
        Self::InvalidDatabaseFile(msg.into())
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Wrap a connection-layer error with what was being attempted.
    ///
    /// Intended for `map_err`: `conn.execute_batch("BEGIN").map_err(ScrubError::sqlite("..."))`.
    pub fn sqlite(context: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let context = context.into();
        move |source| Self::Sqlite { context, source }
    }

    /// Whether this error came from a structural check on source pages
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption(_))
    }
}
