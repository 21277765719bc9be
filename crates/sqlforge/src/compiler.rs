//! State → SQL compilation.
//!
//! A pure translation from a [`QueryState`] to SQL text plus an ordered
//! parameter list. Values never appear in the SQL text; each one becomes a
//! placeholder and is appended to the parameter list in the same order the
//! placeholders appear, which is what positional driver binding relies on.

use crate::condition::{Condition, Op};
use crate::error::{ForgeError, ForgeResult};
use crate::state::{DeleteState, InsertState, QueryState, SelectState, Statement, UpdateState};
use crate::value::Value;

/// Placeholder syntax expected by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placeholder {
    /// `?` (MySQL, SQLite)
    #[default]
    Question,
    /// `$1, $2, ...` (PostgreSQL)
    Dollar,
}

/// The result of compiling a query.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compile with `?` placeholders.
pub fn compile(state: &QueryState) -> ForgeResult<BuiltQuery> {
    compile_with(state, Placeholder::Question)
}

/// Compile with the given placeholder style.
pub fn compile_with(state: &QueryState, placeholder: Placeholder) -> ForgeResult<BuiltQuery> {
    if state.table.trim().is_empty() {
        return Err(ForgeError::validation("a table name is required"));
    }

    let mut w = SqlWriter::new(placeholder);
    match &state.statement {
        Statement::Select(select) => render_select(&mut w, &state.table, select)?,
        Statement::Insert(insert) => render_insert(&mut w, &state.table, insert)?,
        Statement::Update(update) => render_update(&mut w, &state.table, update)?,
        Statement::Delete(delete) => render_delete(&mut w, &state.table, delete)?,
    }
    Ok(w.finish())
}

/// Accumulates SQL text and parameters side by side.
struct SqlWriter {
    sql: String,
    params: Vec<Value>,
    placeholder: Placeholder,
}

impl SqlWriter {
    fn new(placeholder: Placeholder) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            placeholder,
        }
    }

    /// Append a clause, separated from the previous one by a single space.
    fn clause(&mut self, text: &str) {
        if !self.sql.is_empty() {
            self.sql.push(' ');
        }
        self.sql.push_str(text);
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Write a placeholder and record its value.
    fn bind(&mut self, value: &Value) -> ForgeResult<()> {
        if let Value::List(_) = value {
            return Err(ForgeError::validation(
                "list values are only allowed with IN, NOT IN and BETWEEN",
            ));
        }
        self.params.push(value.clone());
        match self.placeholder {
            Placeholder::Question => self.sql.push('?'),
            Placeholder::Dollar => {
                self.sql.push('$');
                self.sql.push_str(&self.params.len().to_string());
            }
        }
        Ok(())
    }

    fn finish(self) -> BuiltQuery {
        BuiltQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

fn render_select(w: &mut SqlWriter, table: &str, s: &SelectState) -> ForgeResult<()> {
    w.clause(&format!("SELECT {}", s.columns.join(", ")));
    w.clause(&format!("FROM {table}"));

    for join in &s.joins {
        if !join.op.is_comparison() {
            return Err(ForgeError::validation(format!(
                "operator {} cannot join {} on {}",
                join.op, join.table, join.left_column
            )));
        }
        w.clause(&format!(
            "{} JOIN {} ON {} {} {}",
            join.join_type.as_str(),
            join.table,
            join.left_column,
            join.op.as_str(),
            join.right_column
        ));
    }

    render_conditions(w, "WHERE", &s.conditions)?;

    if !s.group_by.is_empty() {
        w.clause(&format!("GROUP BY {}", s.group_by.join(", ")));
    }

    render_conditions(w, "HAVING", &s.having)?;

    if !s.order_by.is_empty() {
        let terms: Vec<String> = s
            .order_by
            .iter()
            .map(|t| format!("{} {}", t.column, t.direction.as_str()))
            .collect();
        w.clause(&format!("ORDER BY {}", terms.join(", ")));
    }

    if let Some(limit) = s.limit {
        w.clause(&format!("LIMIT {limit}"));
    }
    if let Some(offset) = s.offset {
        w.clause(&format!("OFFSET {offset}"));
    }
    Ok(())
}

fn render_insert(w: &mut SqlWriter, table: &str, s: &InsertState) -> ForgeResult<()> {
    if s.values.is_empty() {
        return Err(ForgeError::validation("INSERT requires at least one value"));
    }
    let record_count = s.record_count().ok_or_else(|| {
        ForgeError::validation(format!(
            "INSERT has {} values for {} columns; not a whole number of records",
            s.values.len(),
            s.columns.len()
        ))
    })?;

    w.clause(&format!("INSERT INTO {table} ({}) VALUES ", s.columns.join(", ")));
    for (row, chunk) in s.values.chunks(s.columns.len()).enumerate() {
        if row > 0 {
            w.push(", ");
        }
        w.push("(");
        for (i, value) in chunk.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.bind(value)?;
        }
        w.push(")");
    }
    debug_assert_eq!(w.params.len(), record_count * s.columns.len());
    Ok(())
}

fn render_update(w: &mut SqlWriter, table: &str, s: &UpdateState) -> ForgeResult<()> {
    if s.payload.is_empty() {
        return Err(ForgeError::validation("UPDATE requires at least one column to set"));
    }

    w.clause(&format!("UPDATE {table} SET "));
    // SET values bind before WHERE values.
    for (i, (column, value)) in s.payload.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.push(column);
        w.push(" = ");
        w.bind(value)?;
    }

    render_conditions(w, "WHERE", &s.conditions)
}

fn render_delete(w: &mut SqlWriter, table: &str, s: &DeleteState) -> ForgeResult<()> {
    w.clause(&format!("DELETE FROM {table}"));
    render_conditions(w, "WHERE", &s.conditions)
}

/// Render a predicate list; the first predicate is introduced by `keyword`
/// whatever its stored combinator, later ones by their own combinator.
fn render_conditions(w: &mut SqlWriter, keyword: &str, conditions: &[Condition]) -> ForgeResult<()> {
    for (i, condition) in conditions.iter().enumerate() {
        let lead = if i == 0 {
            keyword
        } else {
            condition.combinator.as_str()
        };
        w.clause(lead);
        w.push(" ");
        render_condition(w, condition)?;
    }
    Ok(())
}

fn render_condition(w: &mut SqlWriter, c: &Condition) -> ForgeResult<()> {
    w.push(&c.column);
    w.push(" ");
    w.push(c.op.as_str());

    if c.op.is_unary() {
        return Ok(());
    }

    let value = c.value.as_ref().ok_or_else(|| {
        ForgeError::validation(format!("operator {} on '{}' requires a value", c.op, c.column))
    })?;

    match c.op {
        Op::In | Op::NotIn => {
            w.push(" (");
            match value {
                Value::List(items) if items.is_empty() => w.push("NULL"),
                Value::List(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            w.push(", ");
                        }
                        w.bind(item)?;
                    }
                }
                scalar => w.bind(scalar)?,
            }
            w.push(")");
        }
        Op::Between => match value {
            Value::List(bounds) if bounds.len() == 2 => {
                w.push(" ");
                w.bind(&bounds[0])?;
                w.push(" AND ");
                w.bind(&bounds[1])?;
            }
            other => {
                return Err(ForgeError::validation(format!(
                    "BETWEEN on '{}' requires a two-element list, got {}",
                    c.column,
                    other.type_name()
                )));
            }
        },
        _ => {
            w.push(" ");
            w.bind(value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
