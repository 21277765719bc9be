//! Error types for sqlforge

use std::fmt;
use thiserror::Error;

/// Result type alias for sqlforge operations
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Connection-manager operation that produced a [`ForgeError::Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Query,
    BeginTransaction,
    Commit,
    Rollback,
    Disconnect,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Query => "query",
            Operation::BeginTransaction => "begin_transaction",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
            Operation::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Malformed builder input (empty bulk insert, mismatched records, missing payload)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transaction lifecycle misuse
    #[error("State error: {0}")]
    State(String),

    /// Operation attempted without a live connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failure reported by the underlying database driver
    #[error("{backend} {operation} failed: {message}")]
    Database {
        backend: &'static str,
        operation: Operation,
        message: String,
    },

    /// Unknown operator, operation kind or backend type
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A failed `execute()`, wrapping the connection manager's error
    #[error("Query execution failed: {0}")]
    Execution(#[source] Box<ForgeError>),

    /// Malformed configuration or connection URL
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl ForgeError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    /// Create a driver error tagged with the failing operation
    pub fn database(backend: &'static str, operation: Operation, err: impl fmt::Display) -> Self {
        Self::Database {
            backend,
            operation,
            message: err.to_string(),
        }
    }

    /// Wrap an error raised while executing a compiled query
    pub fn execution(err: ForgeError) -> Self {
        Self::Execution(Box::new(err))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a transaction-state error
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Check if this is a missing-connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is an unsupported-operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation(_))
    }

    /// The operation tag of a driver error, if this is one
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Database { operation, .. } => Some(*operation),
            Self::Execution(inner) => inner.operation(),
            _ => None,
        }
    }
}

/// Failure reported by a driver binding before it is tagged with an [`Operation`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(any(feature = "mysql", feature = "sqlite"))]
impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        Self(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for DriverError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => Self(format!("{}: {}", db_err.code().code(), db_err.message())),
            None => Self(err.to_string()),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for DriverError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self(format!("pool error: {err}"))
    }
}
