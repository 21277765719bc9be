//! Embedded SQLite connection manager.
//!
//! SQLite has no server and no pool: the manager owns one connection and
//! tracks an open transaction with a flag instead of a pinned handle.

use crate::compiler::Placeholder;
use crate::config::DatabaseConfig;
use crate::driver::StatementKind;
use crate::error::{DriverError, ForgeError, ForgeResult, Operation};
use crate::manager::{ConnectionManager, QueryResult};
use crate::value::{Record, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Executor, Row, TypeInfo, ValueRef};
use std::str::FromStr;

const NAME: &str = "sqlite";

/// Connection manager for a SQLite database file (or `:memory:`).
#[derive(Debug)]
pub struct SqliteConnectionManager {
    path: String,
    conn: Option<SqliteConnection>,
    in_transaction: bool,
}

impl SqliteConnectionManager {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self::open_path(config.database.clone())
    }

    /// Manager for the database at `path`; the file is created on connect if
    /// missing.
    pub fn open_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            conn: None,
            in_transaction: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, DriverError> {
        let path = self.path.as_str();
        if path.is_empty() {
            return Err(DriverError::new("no database path configured"));
        }
        if path == ":memory:" {
            return Ok(SqliteConnectOptions::from_str("sqlite::memory:")?);
        }
        if path.starts_with("sqlite:") {
            return Ok(SqliteConnectOptions::from_str(path)?.create_if_missing(true));
        }
        Ok(SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true))
    }

    fn connection(&mut self) -> ForgeResult<&mut SqliteConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| ForgeError::connection("no sqlite connection established"))
    }

    async fn control(&mut self, sql: &'static str, operation: Operation) -> ForgeResult<()> {
        let conn = self.connection()?;
        conn.execute(sql)
            .await
            .map_err(|e| ForgeError::database(NAME, operation, DriverError::from(e)))?;
        Ok(())
    }
}

impl ConnectionManager for SqliteConnectionManager {
    async fn connect(&mut self) -> ForgeResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let db_err = |e: DriverError| ForgeError::database(NAME, Operation::Connect, e);
        let options = self.connect_options().map_err(db_err)?;
        let conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| db_err(e.into()))?;
        self.conn = Some(conn);
        tracing::debug!(target: "sqlforge.manager", backend = NAME, path = %self.path, "connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> ForgeResult<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        if std::mem::take(&mut self.in_transaction) {
            if let Err(e) = conn.execute("ROLLBACK").await {
                tracing::warn!(
                    target: "sqlforge.manager",
                    backend = NAME,
                    error = %e,
                    "rollback of open transaction failed during disconnect"
                );
            }
        }
        conn.close()
            .await
            .map_err(|e| ForgeError::database(NAME, Operation::Disconnect, DriverError::from(e)))?;
        tracing::debug!(target: "sqlforge.manager", backend = NAME, "disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> ForgeResult<QueryResult> {
        let in_transaction = self.in_transaction;
        let conn = self.connection()?;
        let output = run(conn, sql, params)
            .await
            .map_err(|e| ForgeError::database(NAME, Operation::Query, e))?;

        tracing::debug!(
            target: "sqlforge.manager",
            backend = NAME,
            count = output.count,
            in_transaction,
            "query executed"
        );
        Ok(QueryResult {
            rows: output.rows,
            count: output.count,
            query: sql.to_string(),
            parameters: params.to_vec(),
        })
    }

    async fn begin_transaction(&mut self) -> ForgeResult<()> {
        if self.in_transaction {
            return Err(ForgeError::state("transaction already in progress"));
        }
        self.control("BEGIN TRANSACTION", Operation::BeginTransaction)
            .await?;
        self.in_transaction = true;
        tracing::debug!(target: "sqlforge.manager", backend = NAME, "transaction started");
        Ok(())
    }

    async fn commit(&mut self) -> ForgeResult<()> {
        if !self.in_transaction {
            return Err(ForgeError::state("no active transaction"));
        }
        // On failure SQLite keeps the transaction open, so the flag stays set.
        self.control("COMMIT", Operation::Commit).await?;
        self.in_transaction = false;
        tracing::debug!(target: "sqlforge.manager", backend = NAME, "transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> ForgeResult<()> {
        if !self.in_transaction {
            return Err(ForgeError::state("no active transaction"));
        }
        self.control("ROLLBACK", Operation::Rollback).await?;
        self.in_transaction = false;
        tracing::debug!(target: "sqlforge.manager", backend = NAME, "transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }
}

struct Output {
    rows: Vec<Record>,
    count: u64,
}

async fn run(
    conn: &mut SqliteConnection,
    sql: &str,
    params: &[Value],
) -> Result<Output, DriverError> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = bind_value(query, param)?;
    }

    match StatementKind::detect(sql) {
        StatementKind::Read => {
            let rows = query.fetch_all(&mut *conn).await?;
            let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
            let count = rows.len() as u64;
            Ok(Output { rows, count })
        }
        StatementKind::Write => {
            let result = query.execute(&mut *conn).await?;
            Ok(Output {
                rows: Vec::new(),
                count: result.rows_affected(),
            })
        }
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>, DriverError> {
    let query = match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Bytes(b) => query.bind(b.as_slice()),
        Value::List(_) => {
            return Err(DriverError::new("list values cannot be bound as a single parameter"));
        }
    };
    Ok(query)
}

fn decode_row(row: &SqliteRow) -> Result<Record, DriverError> {
    let mut record = Record::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, i, column.type_info().name())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// Decode by the value's storage class; the declared column type only
/// matters to tell booleans from integers.
fn decode_column(row: &SqliteRow, i: usize, declared: &str) -> Result<Value, DriverError> {
    let raw = row.try_get_raw(i)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();

    let value = match storage.as_str() {
        "INTEGER" if declared.eq_ignore_ascii_case("BOOLEAN") => {
            Value::Bool(row.try_get_unchecked::<bool, _>(i)?)
        }
        "INTEGER" => Value::Int(row.try_get_unchecked::<i64, _>(i)?),
        "REAL" => Value::Float(row.try_get_unchecked::<f64, _>(i)?),
        "BLOB" => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(i)?),
        _ => Value::Text(row.try_get_unchecked::<String, _>(i)?),
    };
    Ok(value)
}
