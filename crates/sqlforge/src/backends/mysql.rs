//! MySQL / MariaDB driver over a sqlx connection pool.

use crate::compiler::Placeholder;
use crate::config::DatabaseConfig;
use crate::driver::{PoolDriver, RawOutput, StatementKind};
use crate::error::DriverError;
use crate::manager::PooledConnectionManager;
use crate::value::{Record, Value};
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Column, Executor, Row, TypeInfo, ValueRef};

const DEFAULT_MAX_CONNECTIONS: u32 = 16;

/// MySQL connection manager.
pub type MySqlConnectionManager = PooledConnectionManager<MySqlDriver>;

impl PooledConnectionManager<MySqlDriver> {
    /// Disconnected MySQL manager for `config`.
    pub fn mysql(config: &DatabaseConfig) -> Self {
        Self::new(MySqlDriver::new(config))
    }
}

/// [`PoolDriver`] binding for MySQL.
#[derive(Debug, Clone)]
pub struct MySqlDriver {
    options: MySqlConnectOptions,
    max_connections: u32,
}

impl MySqlDriver {
    pub fn new(config: &DatabaseConfig) -> Self {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.effective_port())
            .username(&config.username);
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        if !config.database.is_empty() {
            options = options.database(&config.database);
        }
        Self::from_options(options)
    }

    /// Use fully custom sqlx connect options (TLS, charset, socket path, ...).
    pub fn from_options(options: MySqlConnectOptions) -> Self {
        Self {
            options,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

impl PoolDriver for MySqlDriver {
    type Pool = MySqlPool;
    type Handle = PoolConnection<MySql>;

    const NAME: &'static str = "mysql";
    const PLACEHOLDER: Placeholder = Placeholder::Question;

    async fn open(&self) -> Result<MySqlPool, DriverError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(self.options.clone())
            .await?;
        Ok(pool)
    }

    async fn acquire(&self, pool: &MySqlPool) -> Result<PoolConnection<MySql>, DriverError> {
        Ok(pool.acquire().await?)
    }

    async fn execute_raw(
        &self,
        handle: &mut PoolConnection<MySql>,
        sql: &str,
        params: &[Value],
    ) -> Result<RawOutput, DriverError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param)?;
        }

        match StatementKind::detect(sql) {
            StatementKind::Read => {
                let rows = query.fetch_all(&mut **handle).await?;
                let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
                Ok(RawOutput::read(rows))
            }
            StatementKind::Write => {
                let result = query.execute(&mut **handle).await?;
                Ok(RawOutput::write(result.rows_affected()))
            }
        }
    }

    async fn begin_raw(&self, handle: &mut PoolConnection<MySql>) -> Result<(), DriverError> {
        (&mut **handle).execute("BEGIN").await?;
        Ok(())
    }

    async fn commit_raw(&self, handle: &mut PoolConnection<MySql>) -> Result<(), DriverError> {
        (&mut **handle).execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback_raw(&self, handle: &mut PoolConnection<MySql>) -> Result<(), DriverError> {
        (&mut **handle).execute("ROLLBACK").await?;
        Ok(())
    }

    async fn close(&self, pool: MySqlPool) -> Result<(), DriverError> {
        pool.close().await;
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Result<Query<'q, MySql, MySqlArguments>, DriverError> {
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

fn decode_row(row: &MySqlRow) -> Result<Record, DriverError> {
    let mut record = Record::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, i, column.type_info().name())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_column(row: &MySqlRow, i: usize, type_name: &str) -> Result<Value, DriverError> {
    if row.try_get_raw(i)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(i)?),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" | "YEAR" => Value::from(row.try_get_unchecked::<u64, _>(i)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::Int(row.try_get_unchecked::<i64, _>(i)?)
        }
        "FLOAT" => Value::Float(f64::from(row.try_get::<f32, _>(i)?)),
        "DOUBLE" => Value::Float(row.try_get::<f64, _>(i)?),
        // Exact numerics and JSON arrive as text; keep them lossless.
        "DECIMAL" | "JSON" => Value::Text(row.try_get_unchecked::<String, _>(i)?),
        "DATETIME" => Value::Text(row.try_get::<chrono::NaiveDateTime, _>(i)?.to_string()),
        "TIMESTAMP" => Value::Text(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(i)?
                .to_rfc3339(),
        ),
        "DATE" => Value::Text(row.try_get::<chrono::NaiveDate, _>(i)?.to_string()),
        "TIME" => Value::Text(row.try_get::<chrono::NaiveTime, _>(i)?.to_string()),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            Value::Bytes(row.try_get::<Vec<u8>, _>(i)?)
        }
        _ => match row.try_get::<String, _>(i) {
            Ok(s) => Value::Text(s),
            Err(_) => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(i)?),
        },
    };
    Ok(value)
}
