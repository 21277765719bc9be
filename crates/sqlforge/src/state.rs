//! Query state: the accumulated intent of one logical statement.

use crate::condition::{Condition, Join, OrderTerm};
use crate::error::ForgeError;
use crate::value::{Record, Value};
use std::fmt;
use std::str::FromStr;

/// The closed set of statement kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Select => "SELECT",
            OperationKind::Insert => "INSERT",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELECT" => Ok(OperationKind::Select),
            "INSERT" => Ok(OperationKind::Insert),
            "UPDATE" => Ok(OperationKind::Update),
            "DELETE" => Ok(OperationKind::Delete),
            _ => Err(ForgeError::unsupported(format!("unknown operation kind '{s}'"))),
        }
    }
}

/// SELECT clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectState {
    /// Projected columns (default `["*"]`)
    pub columns: Vec<String>,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
    pub group_by: Vec<String>,
    pub having: Vec<Condition>,
    pub order_by: Vec<OrderTerm>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Default for SelectState {
    fn default() -> Self {
        Self {
            columns: vec!["*".to_string()],
            joins: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// INSERT payload; `values` is flat and record-major, so its length is a
/// multiple of `columns.len()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertState {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl InsertState {
    /// Number of records, if `values` divides evenly into rows.
    pub fn record_count(&self) -> Option<usize> {
        if self.columns.is_empty() || self.values.len() % self.columns.len() != 0 {
            return None;
        }
        Some(self.values.len() / self.columns.len())
    }
}

/// UPDATE payload and filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateState {
    /// Columns to assign, in SET order
    pub payload: Record,
    pub conditions: Vec<Condition>,
}

/// DELETE filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteState {
    pub conditions: Vec<Condition>,
}

/// The active statement, carrying only the fields its kind can use.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectState),
    Insert(InsertState),
    Update(UpdateState),
    Delete(DeleteState),
}

impl Statement {
    pub fn kind(&self) -> OperationKind {
        match self {
            Statement::Select(_) => OperationKind::Select,
            Statement::Insert(_) => OperationKind::Insert,
            Statement::Update(_) => OperationKind::Update,
            Statement::Delete(_) => OperationKind::Delete,
        }
    }

    /// WHERE conditions, for kinds that have them.
    pub fn conditions(&self) -> Option<&[Condition]> {
        match self {
            Statement::Select(s) => Some(&s.conditions),
            Statement::Update(s) => Some(&s.conditions),
            Statement::Delete(s) => Some(&s.conditions),
            Statement::Insert(_) => None,
        }
    }

    pub(crate) fn conditions_mut(&mut self) -> Option<&mut Vec<Condition>> {
        match self {
            Statement::Select(s) => Some(&mut s.conditions),
            Statement::Update(s) => Some(&mut s.conditions),
            Statement::Delete(s) => Some(&mut s.conditions),
            Statement::Insert(_) => None,
        }
    }
}

impl Default for Statement {
    fn default() -> Self {
        Statement::Select(SelectState::default())
    }
}

/// Everything needed to compile one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryState {
    /// Target table (empty until set)
    pub table: String,
    pub statement: Statement,
}

impl QueryState {
    /// Fresh SELECT state targeting `table`.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            statement: Statement::default(),
        }
    }

    /// A new state that keeps this state's table and nothing else.
    pub fn reset(&self, statement: Statement) -> Self {
        Self {
            table: self.table.clone(),
            statement,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.statement.kind()
    }

    /// WHERE conditions (empty for INSERT).
    pub fn conditions(&self) -> &[Condition] {
        self.statement.conditions().unwrap_or(&[])
    }

    pub fn as_select(&self) -> Option<&SelectState> {
        match &self.statement {
            Statement::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_insert(&self) -> Option<&InsertState> {
        match &self.statement {
            Statement::Insert(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_update(&self) -> Option<&UpdateState> {
        match &self.statement {
            Statement::Update(s) => Some(s),
            _ => None,
        }
    }
}
