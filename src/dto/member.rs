//! Row bindings for member entities and the username/age DTO.

use serde::{Deserialize, Serialize};

use crate::domain::member::Member;
use crate::query::columns::{Column, ValueKind};
use crate::query::predicate::Value;
use crate::query::projection::{
    ConstructorProjection, FieldProjection, FromValue, Projection, Selection, next_value,
};
use crate::repository::errors::{RepositoryError, RepositoryResult};

impl ConstructorProjection for Member {
    const PARAMETERS: &'static [ValueKind] = &[
        ValueKind::Int64,
        ValueKind::Text,
        ValueKind::Int32,
        ValueKind::Int64,
    ];

    fn construct(values: Vec<Value>) -> RepositoryResult<Self> {
        let mut values = values.into_iter();
        Ok(Member {
            id: next_value(&mut values)?,
            username: next_value(&mut values)?,
            age: next_value(&mut values)?,
            team_id: next_value(&mut values)?,
        })
    }
}

/// Every member column, in entity field order.
pub fn member_projection() -> RepositoryResult<Projection<Member>> {
    Projection::constructor(vec![
        Selection::new(Column::MemberId),
        Selection::new(Column::MemberUsername),
        Selection::new(Column::MemberAge),
        Selection::new(Column::MemberTeamId),
    ])
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberDto {
    pub username: Option<String>,
    pub age: i32,
}

impl MemberDto {
    pub fn projection() -> RepositoryResult<Projection<Self>> {
        Projection::constructor(vec![
            Selection::new(Column::MemberUsername),
            Selection::new(Column::MemberAge),
        ])
    }
}

impl ConstructorProjection for MemberDto {
    const PARAMETERS: &'static [ValueKind] = &[ValueKind::Text, ValueKind::Int32];

    fn construct(values: Vec<Value>) -> RepositoryResult<Self> {
        let mut values = values.into_iter();
        Ok(Self {
            username: next_value(&mut values)?,
            age: next_value(&mut values)?,
        })
    }
}

impl FieldProjection for MemberDto {
    const FIELDS: &'static [&'static str] = &["username", "age"];

    fn set_field(&mut self, name: &str, value: Value) -> RepositoryResult<()> {
        match name {
            "username" => self.username = FromValue::from_value(value)?,
            "age" => self.age = FromValue::from_value(value)?,
            other => {
                return Err(RepositoryError::ValidationError(format!(
                    "MemberDto has no field `{other}`"
                )));
            }
        }
        Ok(())
    }
}
