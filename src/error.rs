//! Error types for notedex.

use thiserror::Error;

/// The main error type for all index, storage and search operations.
#[derive(Error, Debug)]
pub enum NotedexError {
    /// I/O failure in the underlying storage.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure, e.g. of the commit point or a config file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure building or loading a term dictionary.
    #[error("Term dictionary error: {0}")]
    Fst(#[from] fst::Error),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    /// The query string could not be parsed.
    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Another writer holds the directory's write lock.
    #[error("Lock obtain failed: {0}")]
    LockObtainFailed(String),

    /// A file failed its checksum or structural validation.
    #[error("Corrupt index: {0}")]
    Corrupt(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("{0}")]
    Other(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NotedexError>;

impl NotedexError {
    pub fn index<S: Into<String>>(msg: S) -> Self {
        NotedexError::Index(msg.into())
    }

    pub fn storage<S: Into<String>>(msg: S) -> Self {
        NotedexError::Storage(msg.into())
    }

    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        NotedexError::Analysis(msg.into())
    }

    pub fn query_parse<S: Into<String>>(msg: S) -> Self {
        NotedexError::QueryParse(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        NotedexError::InvalidArgument(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        NotedexError::InvalidConfig(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        NotedexError::NotFound(msg.into())
    }

    pub fn lock_obtain_failed<S: Into<String>>(msg: S) -> Self {
        NotedexError::LockObtainFailed(msg.into())
    }

    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        NotedexError::Corrupt(msg.into())
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        NotedexError::Other(msg.into())
    }

    /// Whether the error comes from a malformed query string.
    pub fn is_query_parse(&self) -> bool {
        matches!(self, NotedexError::QueryParse(_))
    }
}
