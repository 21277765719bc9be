//! PostgreSQL driver over a deadpool-postgres pool.

use crate::compiler::Placeholder;
use crate::config::DatabaseConfig;
use crate::driver::{PoolDriver, RawOutput, StatementKind};
use crate::error::DriverError;
use crate::manager::PooledConnectionManager;
use crate::value::{Record, Value};
use bytes::BytesMut;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use rust_decimal::Decimal;
use std::error::Error;
use std::str::FromStr;
use tokio_postgres::NoTls;
use tokio_postgres::Row;
use tokio_postgres::types::{IsNull, ToSql, Type};

const DEFAULT_MAX_SIZE: usize = 16;

/// PostgreSQL connection manager.
pub type PgConnectionManager = PooledConnectionManager<PgDriver>;

impl PooledConnectionManager<PgDriver> {
    /// Disconnected PostgreSQL manager for `config`.
    pub fn postgres(config: &DatabaseConfig) -> Self {
        Self::new(PgDriver::new(config))
    }
}

/// [`PoolDriver`] binding for PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgDriver {
    config: tokio_postgres::Config,
    max_size: usize,
}

impl PgDriver {
    pub fn new(config: &DatabaseConfig) -> Self {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host).port(config.effective_port());
        if !config.username.is_empty() {
            pg.user(&config.username);
        }
        if !config.password.is_empty() {
            pg.password(&config.password);
        }
        if !config.database.is_empty() {
            pg.dbname(&config.database);
        }
        Self::from_pg_config(pg)
    }

    /// Use a fully custom `tokio_postgres::Config`.
    pub fn from_pg_config(config: tokio_postgres::Config) -> Self {
        Self {
            config,
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

impl PoolDriver for PgDriver {
    type Pool = Pool;
    type Handle = Object;

    const NAME: &'static str = "postgres";
    const PLACEHOLDER: Placeholder = Placeholder::Dollar;

    async fn open(&self) -> Result<Pool, DriverError> {
        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(self.config.clone(), NoTls, manager_config);
        let pool = Pool::builder(mgr)
            .max_size(self.max_size)
            .build()
            .map_err(|e| DriverError::new(format!("pool build error: {e}")))?;

        // deadpool connects lazily; check out one connection so a bad
        // address or credentials fail here instead of on the first query.
        drop(pool.get().await?);
        Ok(pool)
    }

    async fn acquire(&self, pool: &Pool) -> Result<Object, DriverError> {
        Ok(pool.get().await?)
    }

    async fn execute_raw(
        &self,
        handle: &mut Object,
        sql: &str,
        params: &[Value],
    ) -> Result<RawOutput, DriverError> {
        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        match StatementKind::detect(sql) {
            StatementKind::Read => {
                let rows = handle.query(sql, &params).await?;
                let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
                Ok(RawOutput::read(rows))
            }
            StatementKind::Write => {
                let affected = handle.execute(sql, &params).await?;
                Ok(RawOutput::write(affected))
            }
        }
    }

    async fn begin_raw(&self, handle: &mut Object) -> Result<(), DriverError> {
        handle.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn commit_raw(&self, handle: &mut Object) -> Result<(), DriverError> {
        handle.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback_raw(&self, handle: &mut Object) -> Result<(), DriverError> {
        handle.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn close(&self, pool: Pool) -> Result<(), DriverError> {
        pool.close();
        Ok(())
    }
}

/// Encode `value` as `T` if `T` can be sent as the server-inferred type.
fn encode<T: ToSql>(
    value: T,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if !T::accepts(ty) {
        return Err(format!(
            "cannot bind {} to a parameter of type {ty}",
            std::any::type_name::<T>()
        )
        .into());
    }
    value.to_sql(ty, out)
}

/// Accepts both `2024-01-02T10:00:00` and `2024-01-02 10:00:00`.
fn parse_timestamp(s: &str) -> Result<chrono::NaiveDateTime, chrono::ParseError> {
    chrono::NaiveDateTime::from_str(s)
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
}

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

// Parameter types are inferred by the server from the statement, so a `Value`
// is converted to whatever the placeholder position expects.
impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => encode(*v, ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => encode(i16::try_from(*v)?, ty, out),
                Type::INT4 => encode(i32::try_from(*v)?, ty, out),
                Type::OID => encode(u32::try_from(*v)?, ty, out),
                Type::FLOAT4 => encode(*v as f32, ty, out),
                Type::FLOAT8 => encode(*v as f64, ty, out),
                Type::NUMERIC => encode(Decimal::from(*v), ty, out),
                Type::BOOL => encode(*v != 0, ty, out),
                _ if is_text(ty) => encode(v.to_string(), ty, out),
                _ => encode(*v, ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => encode(*v as f32, ty, out),
                Type::NUMERIC => encode(Decimal::try_from(*v)?, ty, out),
                _ if is_text(ty) => encode(v.to_string(), ty, out),
                _ => encode(*v, ty, out),
            },
            Value::Text(v) => match *ty {
                Type::JSON | Type::JSONB => {
                    encode(serde_json::from_str::<serde_json::Value>(v)?, ty, out)
                }
                Type::UUID => encode(uuid::Uuid::parse_str(v)?, ty, out),
                Type::NUMERIC => encode(Decimal::from_str(v)?, ty, out),
                Type::TIMESTAMPTZ => encode(
                    chrono::DateTime::parse_from_rfc3339(v)?.with_timezone(&chrono::Utc),
                    ty,
                    out,
                ),
                Type::TIMESTAMP => encode(parse_timestamp(v)?, ty, out),
                Type::DATE => encode(chrono::NaiveDate::from_str(v)?, ty, out),
                Type::TIME => encode(chrono::NaiveTime::from_str(v)?, ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    Value::Int(v.trim().parse::<i64>()?).to_sql(ty, out)
                }
                _ => encode(v.as_str(), ty, out),
            },
            Value::Bytes(v) => encode(v.as_slice(), ty, out),
            Value::List(_) => Err("list values cannot be bound as a single parameter".into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn decode_row(row: &Row) -> Result<Record, DriverError> {
    let mut record = Record::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, i, column.type_()).map_err(|e| {
            DriverError::new(format!("column '{}': {}", column.name(), e.0))
        })?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_column(row: &Row, i: usize, ty: &Type) -> Result<Value, DriverError> {
    fn get<'a, T: tokio_postgres::types::FromSql<'a>>(
        row: &'a Row,
        i: usize,
    ) -> Result<Option<T>, DriverError> {
        Ok(row.try_get::<_, Option<T>>(i)?)
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, i)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, i)?.map(Value::from),
        Type::INT4 => get::<i32>(row, i)?.map(Value::from),
        Type::INT8 => get::<i64>(row, i)?.map(Value::Int),
        Type::OID => get::<u32>(row, i)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, i)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, i)?.map(Value::Float),
        Type::NUMERIC => get::<Decimal>(row, i)?.map(|d| Value::Text(d.to_string())),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get::<String>(row, i)?.map(Value::Text)
        }
        Type::BYTEA => get::<Vec<u8>>(row, i)?.map(Value::Bytes),
        Type::JSON | Type::JSONB => {
            get::<serde_json::Value>(row, i)?.map(|j| Value::Text(j.to_string()))
        }
        Type::UUID => get::<uuid::Uuid>(row, i)?.map(|u| Value::Text(u.to_string())),
        Type::TIMESTAMP => {
            get::<chrono::NaiveDateTime>(row, i)?.map(|t| Value::Text(t.to_string()))
        }
        Type::TIMESTAMPTZ => get::<chrono::DateTime<chrono::Utc>>(row, i)?
            .map(|t| Value::Text(t.to_rfc3339())),
        Type::DATE => get::<chrono::NaiveDate>(row, i)?.map(|d| Value::Text(d.to_string())),
        Type::TIME => get::<chrono::NaiveTime>(row, i)?.map(|t| Value::Text(t.to_string())),
        _ => {
            return Err(DriverError::new(format!("unsupported column type {ty}")));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
