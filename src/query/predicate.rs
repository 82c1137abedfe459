//! Boolean expression trees over schema columns.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::query::columns::{Column, ValueKind};

/// A scalar cell value as exchanged with the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value may be stored in a column of the given kind.
    pub fn fits(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (Value::Null, _) => true,
            (Value::Int(_), ValueKind::Int64) => true,
            (Value::Int(v), ValueKind::Int32) => i32::try_from(*v).is_ok(),
            (Value::Text(_), ValueKind::Text) => true,
            _ => false,
        }
    }

    /// SQL comparison. `None` when either side is null or the types differ.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting: null sorts lowest, as in SQLite.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Int(_) => 1,
                Value::Text(_) => 2,
            }
        }
        self.sql_cmp(other)
            .unwrap_or_else(|| rank(self).cmp(&rank(other)))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Lt,
    Loe,
    Gt,
    Goe,
}

impl CompareOp {
    pub const fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Loe => "<=",
            CompareOp::Gt => ">",
            CompareOp::Goe => ">=",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Loe => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Goe => ordering != Ordering::Less,
        }
    }
}

/// A boolean expression over entity columns. Constraint-free queries carry
/// no predicate at all rather than an empty one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    Compare {
        column: Column,
        op: CompareOp,
        value: Value,
    },
    IsNull(Column),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(column: Column, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn lt(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn loe(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Loe, value)
    }

    pub fn gt(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn goe(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Goe, value)
    }

    pub fn is_null(column: Column) -> Self {
        Predicate::IsNull(column)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(vec![self, other])
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(vec![self, other])
    }

    /// Distinct columns referenced anywhere in the tree, in first-seen order.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, out: &mut Vec<Column>) {
        match self {
            Predicate::Compare { column, .. } | Predicate::IsNull(column) => {
                if !out.contains(column) {
                    out.push(*column);
                }
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().for_each(|part| part.collect_columns(out));
            }
            Predicate::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Evaluates the predicate with SQL three-valued logic. `None` stands for
    /// UNKNOWN; a row qualifies only on `Some(true)`.
    pub fn evaluate<F>(&self, lookup: &F) -> Option<bool>
    where
        F: Fn(Column) -> Value,
    {
        match self {
            Predicate::Compare { column, op, value } => lookup(*column)
                .sql_cmp(value)
                .map(|ordering| op.holds(ordering)),
            Predicate::IsNull(column) => Some(lookup(*column).is_null()),
            Predicate::And(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.evaluate(lookup) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown { None } else { Some(true) }
            }
            Predicate::Or(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.evaluate(lookup) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown { None } else { Some(false) }
            }
            Predicate::Not(inner) => inner.evaluate(lookup).map(|v| !v),
        }
    }

    pub fn matches<F>(&self, lookup: &F) -> bool
    where
        F: Fn(Column) -> Value,
    {
        self.evaluate(lookup) == Some(true)
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn join(f: &mut Formatter<'_>, parts: &[Predicate], sep: &str) -> std::fmt::Result {
            write!(f, "(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{part}")?;
            }
            write!(f, ")")
        }

        match self {
            Predicate::Compare { column, op, value } => {
                write!(f, "{column} {} {value}", op.sql())
            }
            Predicate::IsNull(column) => write!(f, "{column} IS NULL"),
            Predicate::And(parts) => join(f, parts, "AND"),
            Predicate::Or(parts) => join(f, parts, "OR"),
            Predicate::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}
