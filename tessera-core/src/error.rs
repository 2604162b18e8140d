/// Top-level Tessera error type.
///
/// All fallible operations in `tessera-core` return [`Result<T, TesseraError>`](Result).
/// Each variant wraps a domain-specific error enum so callers can match on
/// the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum TesseraError {
    /// Error from the graph store layer (`SQLite` operations, transactions).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error while enumerating, reading, or watching workspace files.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from the extraction engine.
    #[error("Graph engine error: {0}")]
    Graph(#[from] tessera_graphs::GraphError),
}

/// Errors from the SQLite-backed graph store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be mapped back into a domain value.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// JSON serialization of stored metadata failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transaction begin/commit/rollback called in the wrong state.
    #[error("Transaction state error: {0}")]
    TransactionState(String),
}

/// Errors from scanning and watching the workspace.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file-system watcher could not be created or attached.
    #[error("Watcher error: {0}")]
    Watch(String),

    /// A line in the ignore file is not a valid pattern.
    #[error("Invalid ignore pattern `{pattern}`: {message}")]
    IgnorePattern {
        /// The offending pattern text.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },
}

/// Errors in Tessera configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<notify::Error> for IndexError {
    fn from(e: notify::Error) -> Self {
        Self::Watch(e.to_string())
    }
}

/// Convenience alias for `Result<T, TesseraError>`.
pub type Result<T> = std::result::Result<T, TesseraError>;
