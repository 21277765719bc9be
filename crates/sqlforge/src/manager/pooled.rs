//! Generic pooled connection manager.

use super::{ConnectionManager, QueryResult};
use crate::compiler::Placeholder;
use crate::driver::PoolDriver;
use crate::error::{DriverError, ForgeError, ForgeResult, Operation};
use crate::value::Value;
use std::fmt;

/// Connection manager over a [`PoolDriver`].
///
/// Outside a transaction every query checks a connection out of the pool and
/// returns it afterwards. `begin_transaction` pins one connection as the
/// transaction handle; queries run on it until `commit` or `rollback` returns
/// it to the pool.
pub struct PooledConnectionManager<D: PoolDriver> {
    driver: D,
    pool: Option<D::Pool>,
    /// Whether `disconnect` closes the pool; false for a pool shared via `from_pool`.
    owns_pool: bool,
    transaction: Option<D::Handle>,
}

impl<D: PoolDriver> PooledConnectionManager<D> {
    /// Create a disconnected manager; the pool is opened by `connect`.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            pool: None,
            owns_pool: true,
            transaction: None,
        }
    }

    /// Wrap an already-open pool; the manager starts connected.
    ///
    /// The pool stays open when this manager disconnects: its handle is only
    /// dropped, so other managers sharing the pool keep working.
    pub fn from_pool(driver: D, pool: D::Pool) -> Self {
        Self {
            driver,
            pool: Some(pool),
            owns_pool: false,
            transaction: None,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The underlying pool, when connected.
    pub fn pool(&self) -> Option<&D::Pool> {
        self.pool.as_ref()
    }

    fn not_connected() -> ForgeError {
        ForgeError::connection(format!("no {} connection established", D::NAME))
    }

    fn no_transaction() -> ForgeError {
        ForgeError::state("no active transaction")
    }
}

impl<D: PoolDriver> fmt::Debug for PooledConnectionManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnectionManager")
            .field("backend", &D::NAME)
            .field("connected", &self.pool.is_some())
            .field("owns_pool", &self.owns_pool)
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

impl<D: PoolDriver> ConnectionManager for PooledConnectionManager<D> {
    async fn connect(&mut self) -> ForgeResult<()> {
        if self.pool.is_some() {
            return Ok(());
        }
        let pool = self
            .driver
            .open()
            .await
            .map_err(|e| ForgeError::database(D::NAME, Operation::Connect, e))?;
        self.pool = Some(pool);
        self.owns_pool = true;
        tracing::debug!(target: "sqlforge.manager", backend = D::NAME, "connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> ForgeResult<()> {
        if let Some(mut handle) = self.transaction.take() {
            // Best effort: the connection is going away either way.
            if let Err(e) = self.driver.rollback_raw(&mut handle).await {
                tracing::warn!(
                    target: "sqlforge.manager",
                    backend = D::NAME,
                    error = %e,
                    "rollback of open transaction failed during disconnect"
                );
            }
            self.driver.release(handle);
        }

        let Some(pool) = self.pool.take() else {
            return Ok(());
        };
        if !self.owns_pool {
            drop(pool);
            tracing::debug!(target: "sqlforge.manager", backend = D::NAME, "detached from shared pool");
            return Ok(());
        }
        self.driver
            .close(pool)
            .await
            .map_err(|e| ForgeError::database(D::NAME, Operation::Disconnect, e))?;
        tracing::debug!(target: "sqlforge.manager", backend = D::NAME, "disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> ForgeResult<QueryResult> {
        let Some(pool) = &self.pool else {
            return Err(Self::not_connected());
        };
        let db_err = |e: DriverError| ForgeError::database(D::NAME, Operation::Query, e);

        let output = match self.transaction.as_mut() {
            Some(handle) => self.driver.execute_raw(handle, sql, params).await,
            None => {
                let mut handle = self.driver.acquire(pool).await.map_err(db_err)?;
                let output = self.driver.execute_raw(&mut handle, sql, params).await;
                self.driver.release(handle);
                output
            }
        }
        .map_err(db_err)?;

        tracing::debug!(
            target: "sqlforge.manager",
            backend = D::NAME,
            count = output.count,
            in_transaction = self.transaction.is_some(),
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
        if self.transaction.is_some() {
            return Err(ForgeError::state("transaction already in progress"));
        }
        let Some(pool) = &self.pool else {
            return Err(Self::not_connected());
        };
        let db_err = |e: DriverError| ForgeError::database(D::NAME, Operation::BeginTransaction, e);

        let mut handle = self.driver.acquire(pool).await.map_err(db_err)?;
        if let Err(e) = self.driver.begin_raw(&mut handle).await {
            self.driver.release(handle);
            return Err(db_err(e));
        }
        self.transaction = Some(handle);
        tracing::debug!(target: "sqlforge.manager", backend = D::NAME, "transaction started");
        Ok(())
    }

    async fn commit(&mut self) -> ForgeResult<()> {
        let Some(mut handle) = self.transaction.take() else {
            return Err(Self::no_transaction());
        };

        if let Err(e) = self.driver.commit_raw(&mut handle).await {
            // Do not hand a connection with a half-finished transaction back to the pool.
            if let Err(rollback_err) = self.driver.rollback_raw(&mut handle).await {
                tracing::warn!(
                    target: "sqlforge.manager",
                    backend = D::NAME,
                    error = %rollback_err,
                    "rollback after failed commit failed"
                );
            }
            self.driver.release(handle);
            return Err(ForgeError::database(D::NAME, Operation::Commit, e));
        }

        self.driver.release(handle);
        tracing::debug!(target: "sqlforge.manager", backend = D::NAME, "transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> ForgeResult<()> {
        let Some(mut handle) = self.transaction.take() else {
            return Err(Self::no_transaction());
        };

        let result = self.driver.rollback_raw(&mut handle).await;
        self.driver.release(handle);
        result.map_err(|e| ForgeError::database(D::NAME, Operation::Rollback, e))?;
        tracing::debug!(target: "sqlforge.manager", backend = D::NAME, "transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn placeholder(&self) -> Placeholder {
        D::PLACEHOLDER
    }
}
