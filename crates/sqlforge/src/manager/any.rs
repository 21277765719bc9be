//! Closed set of backends behind one type, built from configuration.

use super::{ConnectionManager, QueryResult};
use crate::compiler::Placeholder;
use crate::config::{DatabaseConfig, DatabaseKind};
use crate::error::{ForgeError, ForgeResult};
use crate::value::Value;

#[cfg(feature = "mysql")]
use crate::backends::MySqlConnectionManager;
#[cfg(feature = "postgres")]
use crate::backends::PgConnectionManager;
#[cfg(feature = "sqlite")]
use crate::backends::SqliteConnectionManager;

/// A connection manager for whichever backend the configuration names.
#[derive(Debug)]
pub enum AnyConnectionManager {
    #[cfg(feature = "mysql")]
    MySql(MySqlConnectionManager),
    #[cfg(feature = "postgres")]
    Postgres(PgConnectionManager),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnectionManager),
}

/// Build the connection manager for `config`.
///
/// Fails with an unsupported-operation error when the backend's feature is
/// not compiled in.
pub fn connection_manager(config: &DatabaseConfig) -> ForgeResult<AnyConnectionManager> {
    AnyConnectionManager::from_config(config)
}

impl AnyConnectionManager {
    pub fn from_config(config: &DatabaseConfig) -> ForgeResult<Self> {
        match config.kind {
            #[cfg(feature = "mysql")]
            DatabaseKind::MySql => Ok(Self::MySql(MySqlConnectionManager::mysql(config))),
            #[cfg(feature = "postgres")]
            DatabaseKind::Postgres => Ok(Self::Postgres(PgConnectionManager::postgres(config))),
            #[cfg(feature = "sqlite")]
            DatabaseKind::Sqlite => Ok(Self::Sqlite(SqliteConnectionManager::new(config))),
            #[allow(unreachable_patterns)]
            other => Err(ForgeError::unsupported(format!(
                "database type '{other}' is not enabled in this build"
            ))),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        match self {
            #[cfg(feature = "mysql")]
            Self::MySql(_) => DatabaseKind::MySql,
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => DatabaseKind::Postgres,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => DatabaseKind::Sqlite,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $mgr:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "mysql")]
            AnyConnectionManager::MySql($mgr) => $body,
            #[cfg(feature = "postgres")]
            AnyConnectionManager::Postgres($mgr) => $body,
            #[cfg(feature = "sqlite")]
            AnyConnectionManager::Sqlite($mgr) => $body,
        }
    };
}

impl ConnectionManager for AnyConnectionManager {
    async fn connect(&mut self) -> ForgeResult<()> {
        dispatch!(self, mgr => mgr.connect().await)
    }

    async fn disconnect(&mut self) -> ForgeResult<()> {
        dispatch!(self, mgr => mgr.disconnect().await)
    }

    fn is_connected(&self) -> bool {
        dispatch!(self, mgr => mgr.is_connected())
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> ForgeResult<QueryResult> {
        dispatch!(self, mgr => mgr.query(sql, params).await)
    }

    async fn begin_transaction(&mut self) -> ForgeResult<()> {
        dispatch!(self, mgr => mgr.begin_transaction().await)
    }

    async fn commit(&mut self) -> ForgeResult<()> {
        dispatch!(self, mgr => mgr.commit().await)
    }

    async fn rollback(&mut self) -> ForgeResult<()> {
        dispatch!(self, mgr => mgr.rollback().await)
    }

    fn in_transaction(&self) -> bool {
        dispatch!(self, mgr => mgr.in_transaction())
    }

    fn placeholder(&self) -> Placeholder {
        dispatch!(self, mgr => mgr.placeholder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(feature = "mysql", feature = "postgres", feature = "sqlite"))]
    #[test]
    fn builds_each_backend() {
        let mysql = connection_manager(&DatabaseConfig::new(DatabaseKind::MySql)).unwrap();
        assert_eq!(mysql.kind(), DatabaseKind::MySql);
        assert_eq!(mysql.placeholder(), Placeholder::Question);

        let pg = connection_manager(&DatabaseConfig::new(DatabaseKind::Postgres)).unwrap();
        assert_eq!(pg.kind(), DatabaseKind::Postgres);
        assert_eq!(pg.placeholder(), Placeholder::Dollar);

        let sqlite = connection_manager(&DatabaseConfig::sqlite(":memory:")).unwrap();
        assert_eq!(sqlite.kind(), DatabaseKind::Sqlite);
        assert!(!sqlite.is_connected());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn dispatches_to_sqlite() {
        let mut mgr = connection_manager(&DatabaseConfig::sqlite(":memory:")).unwrap();
        mgr.connect().await.unwrap();
        assert!(mgr.is_connected());

        let result = mgr.query("SELECT 1 AS one", &[]).await.unwrap();
        assert_eq!(result.rows[0]["one"], Value::Int(1));

        mgr.begin_transaction().await.unwrap();
        assert!(mgr.in_transaction());
        assert!(mgr.begin_transaction().await.unwrap_err().is_state());
        mgr.rollback().await.unwrap();

        mgr.disconnect().await.unwrap();
        assert!(!mgr.is_connected());
    }
}
