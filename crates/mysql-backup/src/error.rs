//! Error types for the backup library.

use thiserror::Error;

/// Process exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for connection failures.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Process exit code for introspection failures.
pub const EXIT_INTROSPECTION_ERROR: u8 = 3;
/// Process exit code for schema rewrite failures.
pub const EXIT_SCHEMA_REWRITE_ERROR: u8 = 4;
/// Process exit code for I/O and sink failures.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for backup operations.
///
/// Every variant is fatal to a run: the dump is single-pass and not
/// transactional, so nothing is retried.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cannot establish or authenticate the database connection
    #[error("Connection failed: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// An introspection query failed or returned something unusable
    #[error("Introspection failed for {object}: {message}")]
    Introspection { object: String, message: String },

    /// The destination stream is not writable
    #[error("Output sink error ({context}): {source}")]
    Sink {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The CREATE TABLE rewrite has no structural clause left to keep
    #[error("Cannot rewrite CREATE TABLE for {table}: {message}")]
    SchemaRewrite { table: String, message: String },

    /// IO error (config file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackupError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        BackupError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create an Introspection error for a named object
    pub fn introspection(object: impl Into<String>, message: impl ToString) -> Self {
        BackupError::Introspection {
            object: object.into(),
            message: message.to_string(),
        }
    }

    /// Create a Sink error
    pub fn sink(context: impl Into<String>, source: std::io::Error) -> Self {
        BackupError::Sink {
            context: context.into(),
            source,
        }
    }

    /// Create a SchemaRewrite error
    pub fn schema_rewrite(table: impl Into<String>, message: impl Into<String>) -> Self {
        BackupError::SchemaRewrite {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Exit code used by the command line front-end.
    pub fn exit_code(&self) -> u8 {
        match self {
            BackupError::Config(_) | BackupError::Yaml(_) | BackupError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            BackupError::Connection { .. } => EXIT_CONNECTION_ERROR,
            BackupError::Introspection { .. } => EXIT_INTROSPECTION_ERROR,
            BackupError::SchemaRewrite { .. } => EXIT_SCHEMA_REWRITE_ERROR,
            BackupError::Sink { .. } | BackupError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for backup operations.
pub type Result<T> = std::result::Result<T, BackupError>;
