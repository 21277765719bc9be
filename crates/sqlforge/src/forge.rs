//! The orchestrator: a query builder bound to a connection manager.

use crate::builder::QueryBuild;
use crate::compiler::{self, BuiltQuery};
use crate::config::{DatabaseConfig, ForgeOptions};
use crate::error::{ForgeError, ForgeResult};
use crate::manager::{AnyConnectionManager, ConnectionManager, QueryResult};
use crate::state::QueryState;
use crate::value::Record;

/// Fluent builder that executes against a database.
///
/// All [`QueryBuild`] methods are available; the chain ends in
/// [`execute`](QueryForge::execute), which connects lazily, compiles with the
/// backend's placeholder style and runs the statement.
///
/// ```ignore
/// use sqlforge::prelude::*;
///
/// let mut forge = QueryForge::new(&DatabaseConfig::sqlite("app.db"))?;
/// let adults = forge
///     .table("users")
///     .select(["id", "name"])
///     .and_where("age", Op::Gte, 18)
///     .execute()
///     .await?;
/// ```
///
/// One `QueryForge` runs one statement at a time; use separate instances for
/// concurrent work.
#[derive(Debug)]
pub struct QueryForge<M = AnyConnectionManager> {
    state: QueryState,
    manager: M,
    options: ForgeOptions,
}

impl QueryForge<AnyConnectionManager> {
    /// Orchestrator for `config` with default options.
    pub fn new(config: &DatabaseConfig) -> ForgeResult<Self> {
        Self::with_options(config, ForgeOptions::default())
    }

    pub fn with_options(config: &DatabaseConfig, options: ForgeOptions) -> ForgeResult<Self> {
        let manager = AnyConnectionManager::from_config(config)?;
        Ok(Self::with_manager(manager, options))
    }
}

impl<M: ConnectionManager> QueryForge<M> {
    /// Orchestrator over an existing connection manager.
    pub fn with_manager(manager: M, options: ForgeOptions) -> Self {
        Self {
            state: QueryState::default(),
            manager,
            options,
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Direct access to the manager, e.g. for DDL or hand-written SQL.
    pub fn manager_mut(&mut self) -> &mut M {
        &mut self.manager
    }

    pub fn options(&self) -> &ForgeOptions {
        &self.options
    }

    pub fn into_manager(self) -> M {
        self.manager
    }

    pub async fn connect(&mut self) -> ForgeResult<()> {
        self.manager.connect().await
    }

    pub async fn disconnect(&mut self) -> ForgeResult<()> {
        self.manager.disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub async fn begin_transaction(&mut self) -> ForgeResult<()> {
        self.manager.begin_transaction().await
    }

    pub async fn commit(&mut self) -> ForgeResult<()> {
        self.manager.commit().await
    }

    pub async fn rollback(&mut self) -> ForgeResult<()> {
        self.manager.rollback().await
    }

    pub fn in_transaction(&self) -> bool {
        self.manager.in_transaction()
    }

    /// Compile the current state for this backend without running it.
    pub fn build(&self) -> ForgeResult<BuiltQuery> {
        compiler::compile_with(&self.state, self.manager.placeholder())
    }

    /// Run the current statement and return its rows.
    pub async fn execute(&mut self) -> ForgeResult<Vec<Record>> {
        Ok(self.execute_result().await?.rows)
    }

    /// Run the current statement and return the full result.
    ///
    /// Connects first if needed. Failures of the statement itself are wrapped
    /// as [`ForgeError::Execution`]; connect and compile errors are returned
    /// as they are.
    pub async fn execute_result(&mut self) -> ForgeResult<QueryResult> {
        if !self.manager.is_connected() {
            self.manager.connect().await?;
        }

        let BuiltQuery { sql, params } = self.build()?;
        if self.options.logging {
            tracing::info!(
                target: "sqlforge.sql",
                sql = %sql,
                params = ?params,
                "executing query"
            );
        }

        self.manager
            .query(&sql, &params)
            .await
            .map_err(ForgeError::execution)
    }
}

impl<M> QueryBuild for QueryForge<M> {
    fn state(&self) -> &QueryState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut QueryState {
        &mut self.state
    }
}
