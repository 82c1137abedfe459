//! In-process backend holding members and teams in memory.
//!
//! Besides the store it keeps an identity cache of member entities, filled
//! by member-only reads. Later reads of the same member return the cached
//! entity even if the store has changed underneath, until the cache is
//! cleared. Bulk statements go straight to the store and never touch the
//! cache.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use parking_lot::{Mutex, RwLock};

use crate::{
    domain::{
        member::{Member, NewMember, NewTeam, Team},
        types::{MemberId, TeamId},
    },
    pagination::Slice,
    query::{
        columns::{Column, Entity, JoinSpec},
        predicate::{Predicate, Value},
        projection::{Row, Selection},
        sort::{Direction, NullOrdering, SortOrder},
    },
    repository::{
        Assignment, QueryBackend,
        errors::{BackendErrorKind, RepositoryError, RepositoryResult},
    },
};

#[derive(Debug, Default)]
struct Store {
    members: BTreeMap<MemberId, Member>,
    teams: BTreeMap<TeamId, Team>,
    last_member_id: i64,
    last_team_id: i64,
}

impl Store {
    fn next_member_id(&mut self) -> RepositoryResult<MemberId> {
        self.last_member_id += 1;
        Ok(MemberId::new(self.last_member_id)?)
    }

    fn next_team_id(&mut self) -> RepositoryResult<TeamId> {
        self.last_team_id += 1;
        Ok(TeamId::new(self.last_team_id)?)
    }
}

/// A member joined to its team, if the source includes teams.
struct JoinedRow<'a> {
    member: &'a Member,
    team: Option<&'a Team>,
}

impl JoinedRow<'_> {
    fn value(&self, column: Column) -> Value {
        member_value(self.member, column).unwrap_or_else(|| match (column, self.team) {
            (Column::TeamId, Some(team)) => team.id.get().into(),
            (Column::TeamName, Some(team)) => team.name.clone().into(),
            _ => Value::Null,
        })
    }
}

/// Member columns read from the entity; `None` for team columns.
fn member_value(member: &Member, column: Column) -> Option<Value> {
    match column {
        Column::MemberId => Some(member.id.get().into()),
        Column::MemberUsername => Some(member.username.clone().into()),
        Column::MemberAge => Some(member.age.into()),
        Column::MemberTeamId => Some(member.team_id.map(TeamId::get).into()),
        Column::TeamId | Column::TeamName => None,
    }
}

fn ensure_in_source(
    join: &JoinSpec,
    columns: impl IntoIterator<Item = Column>,
) -> RepositoryResult<()> {
    match join.missing(columns) {
        Some(column) => Err(RepositoryError::no_such_column(column)),
        None => Ok(()),
    }
}

fn ensure_member_columns(columns: impl IntoIterator<Item = Column>) -> RepositoryResult<()> {
    ensure_in_source(&JoinSpec::member_only(), columns)
}

fn compare_rows(a: &JoinedRow<'_>, b: &JoinedRow<'_>, sort: &[SortOrder]) -> Ordering {
    sort.iter()
        .map(|order| {
            let (left, right) = (a.value(order.column), b.value(order.column));
            let nulls = match (left.is_null(), right.is_null(), order.nulls) {
                (true, false, NullOrdering::First) | (false, true, NullOrdering::Last) => {
                    Some(Ordering::Less)
                }
                (true, false, NullOrdering::Last) | (false, true, NullOrdering::First) => {
                    Some(Ordering::Greater)
                }
                _ => None,
            };
            nulls.unwrap_or_else(|| match order.direction {
                Direction::Asc => left.sort_cmp(&right),
                Direction::Desc => right.sort_cmp(&left),
            })
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn assign(member: &mut Member, column: Column, value: Value) -> RepositoryResult<()> {
    if !value.fits(column.kind()) || (value.is_null() && !column.nullable()) {
        return Err(RepositoryError::backend(
            BackendErrorKind::ConstraintViolated,
            format!("cannot store {value} in {column}"),
        ));
    }
    match (column, value) {
        (Column::MemberUsername, Value::Text(v)) => member.username = Some(v),
        (Column::MemberUsername, Value::Null) => member.username = None,
        (Column::MemberAge, Value::Int(v)) => {
            member.age = i32::try_from(v).map_err(|_| {
                RepositoryError::backend(
                    BackendErrorKind::ConstraintViolated,
                    format!("age {v} out of range"),
                )
            })?;
        }
        (Column::MemberTeamId, Value::Int(v)) => member.team_id = Some(TeamId::new(v)?),
        (Column::MemberTeamId, Value::Null) => member.team_id = None,
        (column, _) => {
            return Err(RepositoryError::backend(
                BackendErrorKind::ConstraintViolated,
                format!("{column} is not assignable"),
            ));
        }
    }
    Ok(())
}

/// Thread-safe in-memory [`QueryBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: RwLock<Store>,
    identity_cache: Mutex<HashMap<MemberId, Member>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_team(&self, new_team: &NewTeam) -> RepositoryResult<Team> {
        let mut store = self.store.write();
        let team = Team {
            id: store.next_team_id()?,
            name: new_team.name.clone(),
        };
        store.teams.insert(team.id, team.clone());
        Ok(team)
    }

    /// Members currently held by the identity cache, ordered by id.
    pub fn cached_entities(&self) -> Vec<Member> {
        let mut cached: Vec<Member> = self.identity_cache.lock().values().cloned().collect();
        cached.sort_by_key(|member| member.id);
        cached
    }

    fn matches(predicate: &Option<Predicate>, row: &JoinedRow<'_>) -> bool {
        predicate
            .as_ref()
            .is_none_or(|predicate| predicate.matches(&|column| row.value(column)))
    }
}

impl QueryBackend for MemoryBackend {
    fn select_rows(
        &self,
        predicate: &Option<Predicate>,
        selections: &[Selection],
        join: &JoinSpec,
        slice: Option<Slice>,
        sort: &[SortOrder],
    ) -> RepositoryResult<Vec<Row>> {
        ensure_in_source(join, predicate.iter().flat_map(Predicate::columns))?;
        ensure_in_source(join, selections.iter().map(|selection| selection.column))?;
        ensure_in_source(join, sort.iter().map(|order| order.column))?;

        let store = self.store.read();
        let with_teams = join.includes(Entity::Team);
        let mut rows: Vec<JoinedRow<'_>> = store
            .members
            .values()
            .map(|member| JoinedRow {
                member,
                team: member
                    .team_id
                    .filter(|_| with_teams)
                    .and_then(|team_id| store.teams.get(&team_id)),
            })
            .filter(|row| Self::matches(predicate, row))
            .collect();
        rows.sort_by(|a, b| compare_rows(a, b, sort));

        let (skip, take) = match slice {
            Some(slice) => (
                usize::try_from(slice.offset).unwrap_or(usize::MAX),
                usize::try_from(slice.limit).unwrap_or(usize::MAX),
            ),
            None => (0, usize::MAX),
        };
        let page = rows.into_iter().skip(skip).take(take);

        if with_teams {
            return Ok(page
                .map(|row| {
                    selections.iter().fold(Row::new(), |out, selection| {
                        out.with(selection.alias, row.value(selection.column))
                    })
                })
                .collect());
        }

        // Entity reads go through the identity cache.
        let mut cache = self.identity_cache.lock();
        Ok(page
            .map(|row| {
                let member = cache
                    .entry(row.member.id)
                    .or_insert_with(|| row.member.clone());
                selections.iter().fold(Row::new(), |out, selection| {
                    let value = member_value(member, selection.column).unwrap_or(Value::Null);
                    out.with(selection.alias, value)
                })
            })
            .collect())
    }

    fn select_count(&self, predicate: &Option<Predicate>, join: &JoinSpec) -> RepositoryResult<i64> {
        ensure_in_source(join, predicate.iter().flat_map(Predicate::columns))?;

        let store = self.store.read();
        let with_teams = join.includes(Entity::Team);
        let count = store
            .members
            .values()
            .map(|member| JoinedRow {
                member,
                team: member
                    .team_id
                    .filter(|_| with_teams)
                    .and_then(|team_id| store.teams.get(&team_id)),
            })
            .filter(|row| Self::matches(predicate, row))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    fn execute_update(
        &self,
        assignments: &[Assignment],
        predicate: &Option<Predicate>,
    ) -> RepositoryResult<i64> {
        if assignments.is_empty() {
            return Err(RepositoryError::ValidationError(
                "bulk update needs at least one assignment".to_string(),
            ));
        }
        ensure_member_columns(predicate.iter().flat_map(Predicate::columns))?;
        ensure_member_columns(assignments.iter().map(|assignment| match assignment {
            Assignment::Set { column, .. } | Assignment::Add { column, .. } => *column,
        }))?;

        let mut store = self.store.write();
        // Compute every new row before writing any, so a failure leaves the
        // store untouched.
        let mut updated = Vec::new();
        for member in store.members.values() {
            let row = JoinedRow { member, team: None };
            if !Self::matches(predicate, &row) {
                continue;
            }
            let mut next = member.clone();
            for assignment in assignments {
                match assignment {
                    Assignment::Set { column, value } => assign(&mut next, *column, value.clone())?,
                    Assignment::Add { column, delta } => {
                        let current = member_value(&next, *column).unwrap_or(Value::Null);
                        let value = match current {
                            Value::Int(v) => Value::Int(v.checked_add(*delta).ok_or_else(|| {
                                RepositoryError::backend(
                                    BackendErrorKind::ConstraintViolated,
                                    format!("integer overflow updating {column}"),
                                )
                            })?),
                            other => other,
                        };
                        assign(&mut next, *column, value)?;
                    }
                }
            }
            updated.push(next);
        }

        let affected = updated.len();
        for member in updated {
            store.members.insert(member.id, member);
        }
        Ok(i64::try_from(affected).unwrap_or(i64::MAX))
    }

    fn execute_delete(&self, predicate: &Option<Predicate>) -> RepositoryResult<i64> {
        ensure_member_columns(predicate.iter().flat_map(Predicate::columns))?;

        let mut store = self.store.write();
        let before = store.members.len();
        store
            .members
            .retain(|_, member| !Self::matches(predicate, &JoinedRow { member, team: None }));
        Ok(i64::try_from(before - store.members.len()).unwrap_or(i64::MAX))
    }

    fn insert_member(&self, new_member: &NewMember) -> RepositoryResult<Member> {
        let mut store = self.store.write();
        if let Some(team_id) = new_member.team_id {
            if !store.teams.contains_key(&team_id) {
                return Err(RepositoryError::backend(
                    BackendErrorKind::ConstraintViolated,
                    format!("Foreign key constraint violation: no team {team_id}"),
                ));
            }
        }
        let member = Member {
            id: store.next_member_id()?,
            username: new_member.username.clone(),
            age: new_member.age,
            team_id: new_member.team_id,
        };
        store.members.insert(member.id, member.clone());
        Ok(member)
    }

    fn clear_identity_cache(&self) -> RepositoryResult<()> {
        let mut cache = self.identity_cache.lock();
        log::debug!("clearing {} cached members", cache.len());
        cache.clear();
        Ok(())
    }
}
