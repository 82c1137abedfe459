//! Predicates and sort orders as boxed diesel expressions.
//!
//! Two query sources exist: `members` alone and `members LEFT OUTER JOIN
//! teams`. Each gets its own condition and ordering builders so every
//! expression is checked against the tables it may reference. Team columns
//! used against the member-only source fail as `SyntaxError`.
//!
//! Comparisons keep SQL three-valued logic. A comparison against `NULL`,
//! or against a value of the wrong kind, is `UNKNOWN`.

use diesel::dsl::{self, LeftJoinQuerySource};
use diesel::expression::expression_types::NotSelectable;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Nullable};
use diesel::sqlite::Sqlite;

use crate::{
    query::{
        columns::Column,
        predicate::{CompareOp, Predicate, Value},
        sort::{Direction, NullOrdering, SortOrder},
    },
    repository::errors::{RepositoryError, RepositoryResult},
    schema::{members, teams},
};

/// `members LEFT OUTER JOIN teams ON members.team_id = teams.id`
pub type MemberTeamSource = LeftJoinQuerySource<members::table, teams::table>;

pub type Condition<QS> = Box<dyn BoxableExpression<QS, Sqlite, SqlType = Nullable<Bool>>>;

pub type SortTerm<QS> = Box<dyn BoxableExpression<QS, Sqlite, SqlType = NotSelectable>>;

macro_rules! literal {
    ($qs:ty, $sql:expr) => {{
        let condition: Condition<$qs> = Box::new(dsl::sql::<Nullable<Bool>>($sql));
        condition
    }};
}

macro_rules! compare {
    ($qs:ty, $expr:expr, $op:expr, $operand:expr) => {{
        let operand = $operand;
        let condition: Condition<$qs> = match $op {
            CompareOp::Eq => Box::new($expr.eq(operand).nullable()),
            CompareOp::Lt => Box::new($expr.lt(operand).nullable()),
            CompareOp::Loe => Box::new($expr.le(operand).nullable()),
            CompareOp::Gt => Box::new($expr.gt(operand).nullable()),
            CompareOp::Goe => Box::new($expr.ge(operand).nullable()),
        };
        condition
    }};
}

macro_rules! is_null {
    ($qs:ty, $expr:expr) => {{
        let condition: Condition<$qs> = Box::new($expr.is_null().nullable());
        condition
    }};
}

/// Member columns exist in both sources; `None` for team columns.
macro_rules! compare_member_column {
    ($qs:ty, $column:expr, $op:expr, $value:expr) => {
        match ($column, $value) {
            (Column::MemberId, Value::Int(v)) => Some(compare!($qs, members::id, $op, *v)),
            (Column::MemberUsername, Value::Text(v)) => {
                Some(compare!($qs, members::username, $op, v.clone()))
            }
            (Column::MemberAge, Value::Int(v)) => Some(match i32::try_from(*v) {
                Ok(age) => compare!($qs, members::age, $op, age),
                Err(_) if holds_beyond_range($op, *v > 0) => literal!($qs, "1"),
                Err(_) => literal!($qs, "0"),
            }),
            (Column::MemberTeamId, Value::Int(v)) => {
                Some(compare!($qs, members::team_id, $op, *v))
            }
            (Column::TeamId | Column::TeamName, _) => None,
            _ => Some(literal!($qs, "NULL")),
        }
    };
}

macro_rules! member_column_is_null {
    ($qs:ty, $column:expr) => {
        match $column {
            Column::MemberId => Some(is_null!($qs, members::id)),
            Column::MemberUsername => Some(is_null!($qs, members::username)),
            Column::MemberAge => Some(is_null!($qs, members::age)),
            Column::MemberTeamId => Some(is_null!($qs, members::team_id)),
            Column::TeamId | Column::TeamName => None,
        }
    };
}

macro_rules! sort_terms {
    ($qs:ty, $expr:expr, $order:expr) => {{
        let order: &SortOrder = $order;
        let mut terms: Vec<SortTerm<$qs>> = Vec::with_capacity(2);
        match order.nulls {
            NullOrdering::First => terms.push(Box::new($expr.is_null().desc())),
            NullOrdering::Last => terms.push(Box::new($expr.is_null().asc())),
            NullOrdering::Default => {}
        }
        match order.direction {
            Direction::Asc => terms.push(Box::new($expr.asc())),
            Direction::Desc => terms.push(Box::new($expr.desc())),
        }
        terms
    }};
}

/// Folds a predicate tree into one boxed condition over `$qs`.
macro_rules! condition_builder {
    ($name:ident, $qs:ty, $compare:ident, $is_null:ident) => {
        pub fn $name(predicate: &Predicate) -> RepositoryResult<Condition<$qs>> {
            match predicate {
                Predicate::Compare { column, op, value } => $compare(*column, *op, value),
                Predicate::IsNull(column) => $is_null(*column),
                Predicate::And(parts) | Predicate::Or(parts) => {
                    let conjunction = matches!(predicate, Predicate::And(_));
                    let mut conditions = parts.iter().map($name);
                    let Some(first) = conditions.next().transpose()? else {
                        return Ok(if conjunction {
                            literal!($qs, "1")
                        } else {
                            literal!($qs, "0")
                        });
                    };
                    conditions.try_fold(first, |acc, next| {
                        let next = next?;
                        let combined: Condition<$qs> = if conjunction {
                            Box::new(acc.and(next))
                        } else {
                            Box::new(acc.or(next))
                        };
                        Ok(combined)
                    })
                }
                Predicate::Not(inner) => {
                    let negated: Condition<$qs> = Box::new(dsl::not($name(inner)?));
                    Ok(negated)
                }
            }
        }
    };
}

/// Whether `age <op> v` holds for every stored age when `v` lies outside
/// the `i32` range, above it or below it.
fn holds_beyond_range(op: CompareOp, above: bool) -> bool {
    match op {
        CompareOp::Eq => false,
        CompareOp::Lt | CompareOp::Loe => above,
        CompareOp::Gt | CompareOp::Goe => !above,
    }
}

fn member_compare(
    column: Column,
    op: CompareOp,
    value: &Value,
) -> RepositoryResult<Condition<members::table>> {
    compare_member_column!(members::table, column, op, value)
        .ok_or_else(|| RepositoryError::no_such_column(column))
}

fn member_is_null(column: Column) -> RepositoryResult<Condition<members::table>> {
    member_column_is_null!(members::table, column)
        .ok_or_else(|| RepositoryError::no_such_column(column))
}

// Right-hand columns of a left join are only selectable through `.nullable()`.
fn member_team_compare(
    column: Column,
    op: CompareOp,
    value: &Value,
) -> RepositoryResult<Condition<MemberTeamSource>> {
    if let Some(condition) = compare_member_column!(MemberTeamSource, column, op, value) {
        return Ok(condition);
    }
    Ok(match (column, value) {
        (Column::TeamId, Value::Int(v)) => {
            compare!(MemberTeamSource, teams::id.nullable(), op, *v)
        }
        (Column::TeamName, Value::Text(v)) => {
            compare!(MemberTeamSource, teams::name.nullable(), op, v.clone())
        }
        _ => literal!(MemberTeamSource, "NULL"),
    })
}

fn member_team_is_null(column: Column) -> RepositoryResult<Condition<MemberTeamSource>> {
    if let Some(condition) = member_column_is_null!(MemberTeamSource, column) {
        return Ok(condition);
    }
    Ok(match column {
        Column::TeamId => is_null!(MemberTeamSource, teams::id.nullable()),
        _ => is_null!(MemberTeamSource, teams::name.nullable()),
    })
}

condition_builder!(member_condition, members::table, member_compare, member_is_null);
condition_builder!(
    member_team_condition,
    MemberTeamSource,
    member_team_compare,
    member_team_is_null
);

/// `ORDER BY` terms for one sort key over `members`. An explicit null
/// ordering becomes a leading `IS NULL` term.
pub fn member_sort(order: &SortOrder) -> RepositoryResult<Vec<SortTerm<members::table>>> {
    Ok(match order.column {
        Column::MemberId => sort_terms!(members::table, members::id, order),
        Column::MemberUsername => sort_terms!(members::table, members::username, order),
        Column::MemberAge => sort_terms!(members::table, members::age, order),
        Column::MemberTeamId => sort_terms!(members::table, members::team_id, order),
        Column::TeamId | Column::TeamName => {
            return Err(RepositoryError::no_such_column(order.column));
        }
    })
}

pub fn member_team_sort(order: &SortOrder) -> RepositoryResult<Vec<SortTerm<MemberTeamSource>>> {
    Ok(match order.column {
        Column::MemberId => sort_terms!(MemberTeamSource, members::id, order),
        Column::MemberUsername => sort_terms!(MemberTeamSource, members::username, order),
        Column::MemberAge => sort_terms!(MemberTeamSource, members::age, order),
        Column::MemberTeamId => sort_terms!(MemberTeamSource, members::team_id, order),
        Column::TeamId => sort_terms!(MemberTeamSource, teams::id.nullable(), order),
        Column::TeamName => sort_terms!(MemberTeamSource, teams::name.nullable(), order),
    })
}
