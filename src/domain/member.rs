use serde::{Deserialize, Serialize};

use crate::domain::types::{MemberId, TeamId};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub username: Option<String>,
    pub age: i32,
    /// Team the member belongs to, if any.
    pub team_id: Option<TeamId>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewMember {
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<TeamId>,
}

impl NewMember {
    #[must_use]
    pub fn new(username: Option<String>, age: i32, team_id: Option<TeamId>) -> Self {
        Self {
            username,
            age,
            team_id,
        }
    }

    /// Member with a username and no team.
    #[must_use]
    pub fn named(username: impl Into<String>, age: i32) -> Self {
        Self::new(Some(username.into()), age, None)
    }

    #[must_use]
    pub fn in_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewTeam {
    pub name: Option<String>,
}

impl NewTeam {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}
