//! Clause model: predicates, joins and ordering terms.
//!
//! These are plain data; rendering lives in [`crate::compiler`].

use crate::error::ForgeError;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operator for WHERE/HAVING predicates and JOIN conditions.
///
/// # Example
/// ```ignore
/// use sqlforge::Op;
///
/// let op: Op = ">=".parse()?;
/// assert_eq!(op, Op::Gte);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Equal: column = value
    Eq,
    /// Not equal: column <> value
    Ne,
    /// Greater than: column > value
    Gt,
    /// Greater than or equal: column >= value
    Gte,
    /// Less than: column < value
    Lt,
    /// Less than or equal: column <= value
    Lte,
    /// LIKE pattern match
    Like,
    /// NOT LIKE pattern match
    NotLike,
    /// IN (list)
    In,
    /// NOT IN (list)
    NotIn,
    /// BETWEEN a AND b
    Between,
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
}

impl Op {
    /// SQL spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::Between => "BETWEEN",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
        }
    }

    /// Operators that take no right-hand value.
    pub fn is_unary(&self) -> bool {
        matches!(self, Op::IsNull | Op::IsNotNull)
    }

    /// Operators that compare two single operands, the only ones allowed in a
    /// join's ON clause.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Op::Eq | Op::Ne | Op::Gt | Op::Gte | Op::Lt | Op::Lte | Op::Like | Op::NotLike
        )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match normalized.to_ascii_uppercase().as_str() {
            "=" | "==" => Op::Eq,
            "<>" | "!=" => Op::Ne,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            "LIKE" => Op::Like,
            "NOT LIKE" => Op::NotLike,
            "IN" => Op::In,
            "NOT IN" => Op::NotIn,
            "BETWEEN" => Op::Between,
            "IS NULL" => Op::IsNull,
            "IS NOT NULL" => Op::IsNotNull,
            _ => return Err(ForgeError::unsupported(format!("unknown operator '{s}'"))),
        };
        Ok(op)
    }
}

/// How a predicate joins the predicates before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// A single WHERE/HAVING predicate.
///
/// The combinator of the first predicate in a list is never rendered; the
/// clause keyword (`WHERE`/`HAVING`) takes its place.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    /// Absent for `IS NULL` / `IS NOT NULL`.
    pub value: Option<Value>,
    pub combinator: Combinator,
}

impl Condition {
    /// Create a predicate; the value is dropped for unary operators.
    pub fn new(column: impl Into<String>, op: Op, value: Value, combinator: Combinator) -> Self {
        let value = if op.is_unary() { None } else { Some(value) };
        Self {
            column: column.into(),
            op,
            value,
            combinator,
        }
    }

    pub fn and(column: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self::new(column, op, value.into(), Combinator::And)
    }

    pub fn or(column: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self::new(column, op, value.into(), Combinator::Or)
    }
}

/// JOIN flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }
}

/// A JOIN between the target table and `table`, comparing two columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: String,
    pub join_type: JoinType,
    pub left_column: String,
    pub op: Op,
    pub right_column: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(ForgeError::unsupported(format!("unknown sort direction '{s}'"))),
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub column: String,
    pub direction: Direction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_operators() {
        assert_eq!("=".parse::<Op>().unwrap(), Op::Eq);
        assert_eq!("!=".parse::<Op>().unwrap(), Op::Ne);
        assert_eq!("not  in".parse::<Op>().unwrap(), Op::NotIn);
        assert_eq!(" is not null ".parse::<Op>().unwrap(), Op::IsNotNull);
        assert!("~~".parse::<Op>().unwrap_err().is_unsupported());
    }

    #[test]
    fn unary_condition_drops_value() {
        let c = Condition::and("deleted_at", Op::IsNull, 5);
        assert_eq!(c.value, None);
        let c = Condition::or("age", Op::Gt, 5);
        assert_eq!(c.value, Some(Value::Int(5)));
        assert_eq!(c.combinator, Combinator::Or);
    }

    #[test]
    fn comparison_operators() {
        assert!(Op::Eq.is_comparison());
        assert!(Op::NotLike.is_comparison());
        assert!(!Op::In.is_comparison());
        assert!(!Op::Between.is_comparison());
        assert!(!Op::IsNull.is_comparison());
    }

    #[test]
    fn parse_direction() {
        assert_eq!("desc".parse::<Direction>().unwrap(), Direction::Desc);
        assert!("up".parse::<Direction>().is_err());
    }
}
