//! Turns optional search criteria into optional predicates.

use crate::domain::search::{SearchCondition, is_blank};
use crate::query::columns::Column;
use crate::query::predicate::Predicate;

/// `members.username = value`, or nothing for an absent or blank value.
pub fn username_eq(value: Option<&str>) -> Option<Predicate> {
    text_eq(Column::MemberUsername, value)
}

/// `teams.name = value`, or nothing for an absent or blank value.
pub fn team_name_eq(value: Option<&str>) -> Option<Predicate> {
    text_eq(Column::TeamName, value)
}

pub fn age_goe(value: Option<i32>) -> Option<Predicate> {
    value.map(|age| Predicate::goe(Column::MemberAge, age))
}

pub fn age_loe(value: Option<i32>) -> Option<Predicate> {
    value.map(|age| Predicate::loe(Column::MemberAge, age))
}

fn text_eq(column: Column, value: Option<&str>) -> Option<Predicate> {
    if is_blank(value) {
        return None;
    }
    value.map(|v| Predicate::eq(column, v))
}

/// Drops absent predicates and joins the rest with `AND`, preserving
/// argument order. A single survivor is returned as is.
pub fn conjoin<I>(predicates: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Option<Predicate>>,
{
    let mut present: Vec<Predicate> = predicates.into_iter().flatten().collect();
    match present.len() {
        0 => None,
        1 => present.pop(),
        _ => Some(Predicate::And(present)),
    }
}

/// The conjunction of every criterion present in the condition.
pub fn search_predicate(condition: &SearchCondition) -> Option<Predicate> {
    conjoin([
        username_eq(condition.username.as_deref()),
        team_name_eq(condition.team_name.as_deref()),
        age_goe(condition.age_goe),
        age_loe(condition.age_loe),
    ])
}

/// Accumulates conjuncts and disjuncts one call at a time.
///
/// Each combinator consumes the builder, so a half-built expression can
/// never be observed by another query. Absent arguments are ignored, which
/// makes `BooleanBuilder::new().and(a).and(b).build()` equal to
/// `conjoin([a, b])`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BooleanBuilder {
    current: Option<Predicate>,
}

impl BooleanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(initial: Option<Predicate>) -> Self {
        Self { current: initial }
    }

    pub fn and(self, predicate: Option<Predicate>) -> Self {
        let Some(predicate) = predicate else {
            return self;
        };
        let current = match self.current {
            None => predicate,
            Some(Predicate::And(mut parts)) => {
                parts.push(predicate);
                Predicate::And(parts)
            }
            Some(existing) => Predicate::And(vec![existing, predicate]),
        };
        Self {
            current: Some(current),
        }
    }

    pub fn or(self, predicate: Option<Predicate>) -> Self {
        let Some(predicate) = predicate else {
            return self;
        };
        let current = match self.current {
            None => predicate,
            Some(Predicate::Or(mut parts)) => {
                parts.push(predicate);
                Predicate::Or(parts)
            }
            Some(existing) => Predicate::Or(vec![existing, predicate]),
        };
        Self {
            current: Some(current),
        }
    }

    pub fn has_value(&self) -> bool {
        self.current.is_some()
    }

    pub fn build(self) -> Option<Predicate> {
        self.current
    }
}
