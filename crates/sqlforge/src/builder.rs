//! Fluent query builder.
//!
//! [`QueryBuild`] holds every chaining method as a provided method over a
//! [`QueryState`], so the same API is available on the standalone
//! [`QueryBuilder`] and on [`QueryForge`](crate::QueryForge), where the chain
//! can end in `.execute().await`.
//!
//! Switching operation kind (`select`, `insert`, `insert_many`, `update`,
//! `delete`) starts a fresh state that keeps only the table name; `table`
//! starts a fresh state for the new table. Nothing from one logical
//! statement leaks into the next when a builder is reused.
//!
//! # Example
//!
//! ```ignore
//! use sqlforge::prelude::*;
//!
//! let mut qb = QueryBuilder::new();
//! qb.table("users")
//!     .select(["id", "name"])
//!     .and_where("age", Op::Gt, 18)
//!     .order_by("name")
//!     .limit(10);
//!
//! let built = qb.to_sql()?;
//! assert_eq!(built.sql, "SELECT id, name FROM users WHERE age > ? ORDER BY name ASC LIMIT 10");
//! ```

use crate::compiler::{self, BuiltQuery};
use crate::condition::{Combinator, Condition, Direction, Join, JoinType, Op, OrderTerm};
use crate::error::{ForgeError, ForgeResult};
use crate::state::{DeleteState, InsertState, QueryState, SelectState, Statement, UpdateState};
use crate::value::{Record, Value};

/// Chainable mutators over a [`QueryState`].
pub trait QueryBuild {
    /// The live state.
    fn state(&self) -> &QueryState;

    /// Mutable access to the live state.
    fn state_mut(&mut self) -> &mut QueryState;

    /// Set the target table and reset everything else.
    fn table(&mut self, name: impl Into<String>) -> &mut Self {
        *self.state_mut() = QueryState::for_table(name);
        self
    }

    /// Start a SELECT of `columns` (`*` when empty).
    fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut select = SelectState::default();
        if !columns.is_empty() {
            select.columns = columns;
        }
        switch_statement(self, Statement::Select(select))
    }

    /// Start a `SELECT *`.
    fn select_all(&mut self) -> &mut Self {
        switch_statement(self, Statement::Select(SelectState::default()))
    }

    /// Add a WHERE predicate joined with AND.
    fn and_where(&mut self, column: impl Into<String>, op: Op, value: impl Into<Value>) -> &mut Self {
        push_condition(self, Condition::and(column, op, value))
    }

    /// Add a WHERE predicate joined with OR.
    fn or_where(&mut self, column: impl Into<String>, op: Op, value: impl Into<Value>) -> &mut Self {
        push_condition(self, Condition::or(column, op, value))
    }

    /// Add WHERE: column IS NULL
    fn where_null(&mut self, column: impl Into<String>) -> &mut Self {
        push_condition(self, Condition::new(column, Op::IsNull, Value::Null, Combinator::And))
    }

    /// Add WHERE: column IS NOT NULL
    fn where_not_null(&mut self, column: impl Into<String>) -> &mut Self {
        push_condition(self, Condition::new(column, Op::IsNotNull, Value::Null, Combinator::And))
    }

    /// Add INNER JOIN.
    ///
    /// `op` must be a comparison ([`Op::is_comparison`]); other operators fail
    /// when the query is compiled.
    fn join(
        &mut self,
        table: impl Into<String>,
        left_column: impl Into<String>,
        op: Op,
        right_column: impl Into<String>,
    ) -> &mut Self {
        push_join(self, JoinType::Inner, table.into(), left_column.into(), op, right_column.into())
    }

    /// Add LEFT JOIN.
    fn left_join(
        &mut self,
        table: impl Into<String>,
        left_column: impl Into<String>,
        op: Op,
        right_column: impl Into<String>,
    ) -> &mut Self {
        push_join(self, JoinType::Left, table.into(), left_column.into(), op, right_column.into())
    }

    /// Add RIGHT JOIN.
    fn right_join(
        &mut self,
        table: impl Into<String>,
        left_column: impl Into<String>,
        op: Op,
        right_column: impl Into<String>,
    ) -> &mut Self {
        push_join(self, JoinType::Right, table.into(), left_column.into(), op, right_column.into())
    }

    /// Add FULL JOIN.
    fn full_join(
        &mut self,
        table: impl Into<String>,
        left_column: impl Into<String>,
        op: Op,
        right_column: impl Into<String>,
    ) -> &mut Self {
        push_join(self, JoinType::Full, table.into(), left_column.into(), op, right_column.into())
    }

    /// Append GROUP BY columns; repeated calls accumulate.
    fn group_by<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        with_select(self, "GROUP BY", |s| {
            s.group_by.extend(columns.into_iter().map(Into::into));
        })
    }

    /// Add a HAVING predicate joined with AND.
    fn having(&mut self, column: impl Into<String>, op: Op, value: impl Into<Value>) -> &mut Self {
        let condition = Condition::and(column, op, value);
        with_select(self, "HAVING", |s| s.having.push(condition))
    }

    /// ORDER BY column ASC.
    ///
    /// Unlike `and_where` and `group_by`, ordering does not accumulate: each
    /// `order_by*` call replaces the previous ordering.
    fn order_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.order_by_with(column, Direction::Asc)
    }

    /// ORDER BY column DESC (replaces any previous ordering).
    fn order_by_desc(&mut self, column: impl Into<String>) -> &mut Self {
        self.order_by_with(column, Direction::Desc)
    }

    /// ORDER BY column with an explicit direction (replaces any previous ordering).
    fn order_by_with(&mut self, column: impl Into<String>, direction: Direction) -> &mut Self {
        let term = OrderTerm {
            column: column.into(),
            direction,
        };
        with_select(self, "ORDER BY", |s| s.order_by = vec![term])
    }

    /// Set LIMIT.
    fn limit(&mut self, n: u64) -> &mut Self {
        with_select(self, "LIMIT", |s| s.limit = Some(n))
    }

    /// Set OFFSET.
    fn offset(&mut self, n: u64) -> &mut Self {
        with_select(self, "OFFSET", |s| s.offset = Some(n))
    }

    /// Start an INSERT of one record; columns follow the record's key order.
    fn insert<I, K, V>(&mut self, record: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = record
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        switch_statement(self, Statement::Insert(InsertState { columns, values }))
    }

    /// Start a multi-row INSERT.
    ///
    /// Columns come from the first record; every record must carry exactly
    /// the same keys. On error the builder is left untouched.
    fn insert_many<I>(&mut self, records: I) -> ForgeResult<&mut Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let records: Vec<Record> = records.into_iter().collect();
        let Some(first) = records.first() else {
            return Err(ForgeError::validation("insert_many requires at least one record"));
        };
        let columns: Vec<String> = first.keys().cloned().collect();

        let mut values = Vec::with_capacity(columns.len() * records.len());
        for (index, record) in records.iter().enumerate() {
            if record.len() != columns.len() {
                return Err(ForgeError::validation(format!(
                    "record {index} has {} columns, expected {}",
                    record.len(),
                    columns.len()
                )));
            }
            for column in &columns {
                let value = record.get(column).ok_or_else(|| {
                    ForgeError::validation(format!("record {index} is missing column '{column}'"))
                })?;
                values.push(value.clone());
            }
        }

        Ok(switch_statement(self, Statement::Insert(InsertState { columns, values })))
    }

    /// Start an UPDATE assigning `record` (SET order follows key order).
    fn update<I, K, V>(&mut self, record: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let payload: Record = record
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        switch_statement(
            self,
            Statement::Update(UpdateState {
                payload,
                conditions: Vec::new(),
            }),
        )
    }

    /// Start a DELETE.
    fn delete(&mut self) -> &mut Self {
        switch_statement(self, Statement::Delete(DeleteState::default()))
    }

    /// An independent copy of the current state.
    fn get_state(&self) -> QueryState {
        self.state().clone()
    }

    /// Compile the current state with `?` placeholders.
    fn to_sql(&self) -> ForgeResult<BuiltQuery> {
        compiler::compile(self.state())
    }
}

fn switch_statement<B: QueryBuild + ?Sized>(builder: &mut B, statement: Statement) -> &mut B {
    let next = builder.state().reset(statement);
    *builder.state_mut() = next;
    builder
}

fn push_condition<B: QueryBuild + ?Sized>(builder: &mut B, condition: Condition) -> &mut B {
    let kind = builder.state().kind();
    match builder.state_mut().statement.conditions_mut() {
        Some(conditions) => conditions.push(condition),
        None => ignored("WHERE", kind),
    }
    builder
}

fn push_join<B: QueryBuild + ?Sized>(
    builder: &mut B,
    join_type: JoinType,
    table: String,
    left_column: String,
    op: Op,
    right_column: String,
) -> &mut B {
    let join = Join {
        table,
        join_type,
        left_column,
        op,
        right_column,
    };
    with_select(builder, "JOIN", |s| s.joins.push(join))
}

fn with_select<'a, B, F>(builder: &'a mut B, clause: &'static str, apply: F) -> &'a mut B
where
    B: QueryBuild + ?Sized,
    F: FnOnce(&mut SelectState),
{
    match &mut builder.state_mut().statement {
        Statement::Select(select) => apply(select),
        other => ignored(clause, other.kind()),
    }
    builder
}

fn ignored(clause: &'static str, kind: crate::state::OperationKind) {
    tracing::warn!(
        target: "sqlforge.builder",
        clause,
        kind = %kind,
        "clause ignored: not applicable to this operation kind"
    );
}

/// Standalone builder holding its own [`QueryState`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    state: QueryState,
}

impl QueryBuilder {
    /// Create an empty builder (SELECT *, no table).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder already targeting `table`.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            state: QueryState::for_table(table),
        }
    }

    /// Compile the current state with the given placeholder style.
    pub fn build_with(&self, placeholder: compiler::Placeholder) -> ForgeResult<BuiltQuery> {
        compiler::compile_with(&self.state, placeholder)
    }
}

impl QueryBuild for QueryBuilder {
    fn state(&self) -> &QueryState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut QueryState {
        &mut self.state
    }
}
