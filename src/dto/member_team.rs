//! Flat member + team read shape produced by the search operations.

use serde::{Deserialize, Serialize};

use crate::query::columns::{Column, ValueKind};
use crate::query::predicate::Value;
use crate::query::projection::{
    Accessor, AccessorProjection, ConstructorProjection, FieldProjection, FromValue, Projection,
    Selection, next_value,
};
use crate::repository::errors::{RepositoryError, RepositoryResult};

/// A member row left-joined with its team. `team_id` and `team_name` are
/// `None` exactly when the member has no team.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberTeamRecord {
    pub member_id: i64,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
}

impl MemberTeamRecord {
    #[must_use]
    pub fn new(
        member_id: i64,
        username: Option<String>,
        age: i32,
        team_id: Option<i64>,
        team_name: Option<String>,
    ) -> Self {
        Self {
            member_id,
            username,
            age,
            team_id,
            team_name,
        }
    }

    /// `members.id AS member_id, members.username, members.age,
    /// teams.id AS team_id, teams.name AS team_name`
    pub fn selections() -> Vec<Selection> {
        vec![
            Selection::aliased(Column::MemberId, "member_id"),
            Selection::aliased(Column::MemberUsername, "username"),
            Selection::aliased(Column::MemberAge, "age"),
            Selection::aliased(Column::TeamId, "team_id"),
            Selection::aliased(Column::TeamName, "team_name"),
        ]
    }

    /// The projection used by the search operations.
    pub fn projection() -> RepositoryResult<Projection<Self>> {
        Projection::constructor(Self::selections())
    }

    pub fn field_projection() -> RepositoryResult<Projection<Self>> {
        Projection::fields(Self::selections())
    }

    pub fn accessor_projection() -> RepositoryResult<Projection<Self>> {
        Projection::accessors(Self::selections())
    }

    pub fn set_member_id(&mut self, value: Value) -> RepositoryResult<()> {
        self.member_id = FromValue::from_value(value)?;
        Ok(())
    }

    pub fn set_username(&mut self, value: Value) -> RepositoryResult<()> {
        self.username = FromValue::from_value(value)?;
        Ok(())
    }

    pub fn set_age(&mut self, value: Value) -> RepositoryResult<()> {
        self.age = FromValue::from_value(value)?;
        Ok(())
    }

    pub fn set_team_id(&mut self, value: Value) -> RepositoryResult<()> {
        self.team_id = FromValue::from_value(value)?;
        Ok(())
    }

    pub fn set_team_name(&mut self, value: Value) -> RepositoryResult<()> {
        self.team_name = FromValue::from_value(value)?;
        Ok(())
    }
}

impl ConstructorProjection for MemberTeamRecord {
    const PARAMETERS: &'static [ValueKind] = &[
        ValueKind::Int64,
        ValueKind::Text,
        ValueKind::Int32,
        ValueKind::Int64,
        ValueKind::Text,
    ];

    fn construct(values: Vec<Value>) -> RepositoryResult<Self> {
        let mut values = values.into_iter();
        Ok(Self::new(
            next_value(&mut values)?,
            next_value(&mut values)?,
            next_value(&mut values)?,
            next_value(&mut values)?,
            next_value(&mut values)?,
        ))
    }
}

impl FieldProjection for MemberTeamRecord {
    const FIELDS: &'static [&'static str] =
        &["member_id", "username", "age", "team_id", "team_name"];

    fn set_field(&mut self, name: &str, value: Value) -> RepositoryResult<()> {
        match name {
            "member_id" => self.member_id = FromValue::from_value(value)?,
            "username" => self.username = FromValue::from_value(value)?,
            "age" => self.age = FromValue::from_value(value)?,
            "team_id" => self.team_id = FromValue::from_value(value)?,
            "team_name" => self.team_name = FromValue::from_value(value)?,
            other => {
                return Err(RepositoryError::ValidationError(format!(
                    "MemberTeamRecord has no field `{other}`"
                )));
            }
        }
        Ok(())
    }
}

impl AccessorProjection for MemberTeamRecord {
    const ACCESSORS: &'static [Accessor<Self>] = &[
        Accessor {
            name: "member_id",
            set: Self::set_member_id,
        },
        Accessor {
            name: "username",
            set: Self::set_username,
        },
        Accessor {
            name: "age",
            set: Self::set_age,
        },
        Accessor {
            name: "team_id",
            set: Self::set_team_id,
        },
        Accessor {
            name: "team_name",
            set: Self::set_team_name,
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::projection::Row;

    fn row(team: Option<(i64, &str)>) -> Row {
        Row::new()
            .with("member_id", 1i64)
            .with("username", "member1")
            .with("age", 10)
            .with("team_id", team.map(|(id, _)| id))
            .with("team_name", team.map(|(_, name)| name))
    }

    #[test]
    fn all_binding_styles_agree() {
        let expected = MemberTeamRecord::new(
            1,
            Some("member1".into()),
            10,
            Some(7),
            Some("teamA".into()),
        );
        let by_constructor = MemberTeamRecord::projection()
            .unwrap()
            .map_row(row(Some((7, "teamA"))))
            .unwrap();
        let by_field = MemberTeamRecord::field_projection()
            .unwrap()
            .map_row(row(Some((7, "teamA"))))
            .unwrap();
        let by_accessor = MemberTeamRecord::accessor_projection()
            .unwrap()
            .map_row(row(Some((7, "teamA"))))
            .unwrap();
        assert_eq!(by_constructor, expected);
        assert_eq!(by_field, expected);
        assert_eq!(by_accessor, expected);
    }

    #[test]
    fn missing_team_maps_to_none() {
        let record = MemberTeamRecord::projection()
            .unwrap()
            .map_row(row(None))
            .unwrap();
        assert_eq!(record.team_id, None);
        assert_eq!(record.team_name, None);
    }

    #[test]
    fn field_binding_requires_matching_alias() {
        let err = Projection::<MemberTeamRecord>::fields(vec![Selection::new(
            Column::MemberTeamId,
        )])
        .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(msg) if msg.contains("member_team_id")));
    }

    #[test]
    fn accessor_binding_accepts_subsets_in_any_order() {
        let projection = Projection::<MemberTeamRecord>::accessors(vec![
            Selection::aliased(Column::TeamName, "team_name"),
            Selection::aliased(Column::MemberAge, "age"),
        ])
        .unwrap();
        let record = projection
            .map_row(Row::new().with("team_name", "teamB").with("age", 30))
            .unwrap();
        assert_eq!(record.team_name.as_deref(), Some("teamB"));
        assert_eq!(record.age, 30);
        assert_eq!(record.member_id, 0);
    }
}
