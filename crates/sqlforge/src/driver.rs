//! Driver seam between the pooled connection manager and a concrete client
//! library.
//!
//! A [`PoolDriver`] knows how to open a pool, check out a handle, run raw SQL
//! with bound [`Value`]s and issue the transaction control statements. All
//! lifecycle bookkeeping (connected or not, whether a transaction handle is
//! held, error tagging) lives in
//! [`PooledConnectionManager`](crate::manager::PooledConnectionManager) so each
//! backend only supplies the driver calls.

use crate::compiler::Placeholder;
use crate::error::DriverError;
use crate::value::{Record, Value};
use std::future::Future;

/// Whether a statement returns rows or an affected-row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

impl StatementKind {
    /// Classify SQL by its first keyword, skipping whitespace, comments and
    /// opening parentheses.
    pub fn detect(sql: &str) -> Self {
        const READ_KEYWORDS: [&str; 7] = [
            "SELECT", "WITH", "SHOW", "EXPLAIN", "PRAGMA", "VALUES", "DESCRIBE",
        ];

        let trimmed = strip_sql_prefix(sql);
        if READ_KEYWORDS
            .iter()
            .any(|kw| starts_with_keyword(trimmed, kw))
        {
            StatementKind::Read
        } else {
            StatementKind::Write
        }
    }
}

/// Strip leading whitespace, SQL comments (`--` and `/* */`) and parentheses
/// to find the first meaningful keyword.
fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            if let Some(pos) = s.find('\n') {
                s = &s[pos + 1..];
                continue;
            }
            return "";
        }
        if s.starts_with("/*") {
            if let Some(pos) = s.find("*/") {
                s = &s[pos + 2..];
                continue;
            }
            return "";
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

/// Case-insensitive keyword match that does not accept a longer identifier
/// (`SELECTED` is not `SELECT`).
fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(keyword) => s[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_')),
        _ => false,
    }
}

/// Raw result of one statement, before it is paired with its SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutput {
    pub rows: Vec<Record>,
    /// Rows returned for reads, rows affected for writes
    pub count: u64,
}

impl RawOutput {
    pub fn read(rows: Vec<Record>) -> Self {
        let count = rows.len() as u64;
        Self { rows, count }
    }

    pub fn write(affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            count: affected,
        }
    }
}

/// Backend driver operations over a connection pool.
///
/// Implementations are stateless apart from their connection options; the pool
/// and any checked-out handle are owned by the manager and passed in.
pub trait PoolDriver: Send + Sync + 'static {
    /// Pool type produced by [`open`](PoolDriver::open).
    type Pool: Send + Sync;
    /// One checked-out connection.
    type Handle: Send;

    /// Backend name used in error messages and logs.
    const NAME: &'static str;
    /// Placeholder style the backend expects.
    const PLACEHOLDER: Placeholder;

    /// Create the pool and verify the server is reachable.
    fn open(&self) -> impl Future<Output = Result<Self::Pool, DriverError>> + Send;

    /// Check out a connection.
    fn acquire(
        &self,
        pool: &Self::Pool,
    ) -> impl Future<Output = Result<Self::Handle, DriverError>> + Send;

    /// Run one statement with positional parameters.
    fn execute_raw(
        &self,
        handle: &mut Self::Handle,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<RawOutput, DriverError>> + Send;

    fn begin_raw(
        &self,
        handle: &mut Self::Handle,
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    fn commit_raw(
        &self,
        handle: &mut Self::Handle,
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    fn rollback_raw(
        &self,
        handle: &mut Self::Handle,
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Return a handle to the pool. Dropping it is enough for most pools.
    fn release(&self, handle: Self::Handle) {
        drop(handle);
    }

    /// Close the pool, waiting for checked-in connections to shut down.
    fn close(&self, pool: Self::Pool) -> impl Future<Output = Result<(), DriverError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_reads() {
        for sql in [
            "SELECT 1",
            "  select * from users",
            "WITH t AS (SELECT 1) SELECT * FROM t",
            "(SELECT 1) UNION (SELECT 2)",
            "-- leading comment\nSELECT 1",
            "/* hint */ SELECT 1",
            "SHOW TABLES",
            "EXPLAIN SELECT 1",
            "PRAGMA table_info(users)",
            "VALUES (1), (2)",
            "DESCRIBE users",
        ] {
            assert_eq!(StatementKind::detect(sql), StatementKind::Read, "{sql}");
        }
    }

    #[test]
    fn detects_writes() {
        for sql in [
            "INSERT INTO users (name) VALUES (?)",
            "UPDATE users SET name = ?",
            "DELETE FROM users",
            "CREATE TABLE t (id INTEGER)",
            "BEGIN",
            "selected_rows",
            "",
            "-- only a comment",
        ] {
            assert_eq!(StatementKind::detect(sql), StatementKind::Write, "{sql}");
        }
    }

    #[test]
    fn raw_output_counts() {
        let out = RawOutput::read(vec![Record::new(), Record::new()]);
        assert_eq!(out.count, 2);
        assert_eq!(RawOutput::write(5).count, 5);
        assert!(RawOutput::write(5).rows.is_empty());
    }
}
