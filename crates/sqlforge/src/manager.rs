//! Connection managers: one live connection (or pool) per backend, plus the
//! transaction lifecycle on top of it.

mod any;
mod pooled;


pub use any::{AnyConnectionManager, connection_manager};
pub use pooled::PooledConnectionManager;

use crate::compiler::Placeholder;
use crate::error::ForgeResult;
use crate::value::{Record, Value};
use serde::Serialize;
use std::future::Future;

/// Outcome of one executed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Returned rows (empty for writes)
    pub rows: Vec<Record>,
    /// Rows returned for reads, rows affected for writes
    pub count: u64,
    /// The SQL that ran
    pub query: String,
    /// The bound parameters, in placeholder order
    pub parameters: Vec<Value>,
}

/// Uniform contract over the supported backends.
///
/// Transaction rules shared by every implementation:
/// - `begin_transaction` fails with a state error when a transaction is already
///   open and with a connection error when not connected.
/// - `commit` and `rollback` fail with a state error when no transaction is open.
/// - While a transaction is open, `query` runs inside it.
///
/// Driver failures surface as [`ForgeError::Database`](crate::ForgeError::Database)
/// tagged with the failing operation.
pub trait ConnectionManager: Send {
    /// Establish the connection. Calling it again while connected is a no-op.
    fn connect(&mut self) -> impl Future<Output = ForgeResult<()>> + Send;

    /// Close the connection. A no-op when not connected.
    fn disconnect(&mut self) -> impl Future<Output = ForgeResult<()>> + Send;

    fn is_connected(&self) -> bool;

    /// Execute raw SQL with positional parameters.
    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = ForgeResult<QueryResult>> + Send;

    fn begin_transaction(&mut self) -> impl Future<Output = ForgeResult<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = ForgeResult<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = ForgeResult<()>> + Send;

    fn in_transaction(&self) -> bool;

    /// Placeholder style expected by [`query`](ConnectionManager::query).
    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }
}
