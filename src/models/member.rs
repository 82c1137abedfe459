//! Diesel models for members and teams.

use diesel::prelude::*;

use crate::domain::member::{
    Member as DomainMember, NewMember as DomainNewMember, NewTeam as DomainNewTeam,
    Team as DomainTeam,
};
use crate::domain::types::{MemberId, TeamId, TypeConstraintError};
use crate::query::columns::Column;
use crate::query::predicate::Value;

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::members)]
/// Diesel model for [`crate::domain::member::Member`].
pub struct Member {
    pub id: i64,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::members)]
/// Insertable form of [`Member`].
pub struct NewMember<'a> {
    pub username: Option<&'a str>,
    pub age: i32,
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::teams)]
/// Diesel model for [`crate::domain::member::Team`].
pub struct Team {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::teams)]
pub struct NewTeam<'a> {
    pub name: Option<&'a str>,
}

impl Member {
    /// Value of a `members` column; `None` for team columns.
    pub fn value(&self, column: Column) -> Option<Value> {
        match column {
            Column::MemberId => Some(self.id.into()),
            Column::MemberUsername => Some(self.username.clone().into()),
            Column::MemberAge => Some(self.age.into()),
            Column::MemberTeamId => Some(self.team_id.into()),
            Column::TeamId | Column::TeamName => None,
        }
    }
}

impl Team {
    pub fn value(&self, column: Column) -> Option<Value> {
        match column {
            Column::TeamId => Some(self.id.into()),
            Column::TeamName => Some(self.name.clone().into()),
            _ => None,
        }
    }
}

impl TryFrom<Member> for DomainMember {
    type Error = TypeConstraintError;

    fn try_from(member: Member) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MemberId::try_from(member.id)?,
            username: member.username,
            age: member.age,
            team_id: member.team_id.map(TeamId::try_from).transpose()?,
        })
    }
}

impl TryFrom<Team> for DomainTeam {
    type Error = TypeConstraintError;

    fn try_from(team: Team) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TeamId::try_from(team.id)?,
            name: team.name,
        })
    }
}

impl<'a> From<&'a DomainNewMember> for NewMember<'a> {
    fn from(member: &'a DomainNewMember) -> Self {
        Self {
            username: member.username.as_deref(),
            age: member.age,
            team_id: member.team_id.map(TeamId::get),
        }
    }
}

impl<'a> From<&'a DomainNewTeam> for NewTeam<'a> {
    fn from(team: &'a DomainNewTeam) -> Self {
        Self {
            name: team.name.as_deref(),
        }
    }
}
