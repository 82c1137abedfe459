//! Hand-written schema descriptor shared by predicates, projections and the
//! backends.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Member,
    Team,
}

impl Entity {
    pub const fn table(self) -> &'static str {
        match self {
            Entity::Member => "members",
            Entity::Team => "teams",
        }
    }
}

/// Scalar type carried by a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int64,
    Int32,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    MemberId,
    MemberUsername,
    MemberAge,
    /// Foreign key from a member to its team.
    MemberTeamId,
    TeamId,
    TeamName,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::MemberId,
        Column::MemberUsername,
        Column::MemberAge,
        Column::MemberTeamId,
        Column::TeamId,
        Column::TeamName,
    ];

    pub const fn entity(self) -> Entity {
        match self {
            Column::MemberId | Column::MemberUsername | Column::MemberAge | Column::MemberTeamId => {
                Entity::Member
            }
            Column::TeamId | Column::TeamName => Entity::Team,
        }
    }

    pub const fn table(self) -> &'static str {
        self.entity().table()
    }

    /// Column name inside its table.
    pub const fn name(self) -> &'static str {
        match self {
            Column::MemberId | Column::TeamId => "id",
            Column::MemberUsername => "username",
            Column::MemberAge => "age",
            Column::MemberTeamId => "team_id",
            Column::TeamName => "name",
        }
    }

    /// Canonical output alias, unique across the joined source.
    pub const fn alias(self) -> &'static str {
        match self {
            Column::MemberId => "member_id",
            Column::MemberUsername => "username",
            Column::MemberAge => "age",
            Column::MemberTeamId => "member_team_id",
            Column::TeamId => "team_id",
            Column::TeamName => "team_name",
        }
    }

    pub const fn kind(self) -> ValueKind {
        match self {
            Column::MemberId | Column::MemberTeamId | Column::TeamId => ValueKind::Int64,
            Column::MemberAge => ValueKind::Int32,
            Column::MemberUsername | Column::TeamName => ValueKind::Text,
        }
    }

    pub const fn nullable(self) -> bool {
        matches!(
            self,
            Column::MemberUsername | Column::MemberTeamId | Column::TeamName
        )
    }

    pub fn from_alias(alias: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|column| column.alias() == alias)
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table(), self.name())
    }
}

/// The source a query reads from: the member table, optionally left-outer
/// joined to the tables its foreign keys point at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinSpec {
    pub base: Entity,
    /// `(foreign key on the base, joined entity)` pairs.
    pub left_outer_joins: Vec<(Column, Entity)>,
}

impl JoinSpec {
    pub fn member_only() -> Self {
        Self {
            base: Entity::Member,
            left_outer_joins: Vec::new(),
        }
    }

    pub fn member_with_team() -> Self {
        Self {
            base: Entity::Member,
            left_outer_joins: vec![(Column::MemberTeamId, Entity::Team)],
        }
    }

    pub fn includes(&self, entity: Entity) -> bool {
        self.base == entity
            || self
                .left_outer_joins
                .iter()
                .any(|(_, joined)| *joined == entity)
    }

    /// The first column this source cannot provide.
    pub fn missing(&self, columns: impl IntoIterator<Item = Column>) -> Option<Column> {
        columns
            .into_iter()
            .find(|column| !self.includes(column.entity()))
    }

    /// The smallest source able to evaluate every given column. Dropping a
    /// many-to-one left join never changes the row count.
    pub fn covering(columns: impl IntoIterator<Item = Column>) -> Self {
        if columns
            .into_iter()
            .any(|column| column.entity() == Entity::Team)
        {
            Self::member_with_team()
        } else {
            Self::member_only()
        }
    }
}
