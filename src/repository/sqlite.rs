//! SQLite backend: composes each call with diesel's query DSL and runs it
//! on a pooled connection.

use diesel::prelude::*;

use crate::{
    db::{DbConnection, DbPool, establish_connection_pool, get_connection},
    domain::member::{Member, NewMember, NewTeam, Team},
    models::{
        config::RepositoryConfig,
        member::{
            Member as DbMember, NewMember as DbNewMember, NewTeam as DbNewTeam, Team as DbTeam,
        },
    },
    pagination::Slice,
    query::{
        columns::{Column, Entity, JoinSpec},
        predicate::{Predicate, Value},
        projection::{Row, Selection},
        sort::SortOrder,
    },
    repository::{
        Assignment, QueryBackend,
        errors::{BackendErrorKind, RepositoryError, RepositoryResult},
        expressions::{member_condition, member_sort, member_team_condition, member_team_sort},
    },
    schema::{members, teams},
};

/// Ids per `IN (..)` list, well under SQLite's bound-parameter limit.
const ID_CHUNK: usize = 500;

/// [`QueryBackend`] over a Diesel SQLite connection pool. Cloning shares
/// the pool.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: DbPool,
}

impl SqliteBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(config: &RepositoryConfig) -> RepositoryResult<Self> {
        let pool = establish_connection_pool(config)?;
        log::info!("connected to {}", config.database_url);
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(get_connection(&self.pool)?)
    }

    pub fn insert_team(&self, new_team: &NewTeam) -> RepositoryResult<Team> {
        let mut conn = self.conn()?;
        let db_new_team: DbNewTeam = new_team.into();
        let db_team = diesel::insert_into(teams::table)
            .values(&db_new_team)
            .get_result::<DbTeam>(&mut conn)?;

        Team::try_from(db_team).map_err(RepositoryError::from)
    }
}

/// A validated bulk assignment on a `members` column.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MemberChange {
    Username(Option<String>),
    Age(i32),
    TeamId(Option<i64>),
    AddAge(i32),
    AddTeamId(i64),
}

fn cannot_store(value: impl std::fmt::Display, column: Column) -> RepositoryError {
    RepositoryError::backend(
        BackendErrorKind::ConstraintViolated,
        format!("cannot store {value} in {column}"),
    )
}

impl TryFrom<&Assignment> for MemberChange {
    type Error = RepositoryError;

    fn try_from(assignment: &Assignment) -> Result<Self, Self::Error> {
        let column = match assignment {
            Assignment::Set { column, .. } | Assignment::Add { column, .. } => *column,
        };
        if column.entity() != Entity::Member {
            return Err(RepositoryError::no_such_column(column));
        }
        match assignment {
            Assignment::Set { column, value } => match (column, value) {
                (Column::MemberUsername, Value::Text(v)) => Ok(Self::Username(Some(v.clone()))),
                (Column::MemberUsername, Value::Null) => Ok(Self::Username(None)),
                (Column::MemberAge, Value::Int(v)) => i32::try_from(*v)
                    .map(Self::Age)
                    .map_err(|_| cannot_store(value, *column)),
                (Column::MemberTeamId, Value::Int(v)) => Ok(Self::TeamId(Some(*v))),
                (Column::MemberTeamId, Value::Null) => Ok(Self::TeamId(None)),
                (Column::MemberId, _) => Err(RepositoryError::backend(
                    BackendErrorKind::ConstraintViolated,
                    format!("{column} is not assignable"),
                )),
                _ => Err(cannot_store(value, *column)),
            },
            Assignment::Add { column, delta } => match column {
                Column::MemberAge => i32::try_from(*delta)
                    .map(Self::AddAge)
                    .map_err(|_| cannot_store(delta, *column)),
                Column::MemberTeamId => Ok(Self::AddTeamId(*delta)),
                _ => Err(RepositoryError::backend(
                    BackendErrorKind::ConstraintViolated,
                    format!("{column} is not assignable"),
                )),
            },
        }
    }
}

impl MemberChange {
    fn apply(&self, conn: &mut DbConnection, ids: &[i64]) -> RepositoryResult<()> {
        for chunk in ids.chunks(ID_CHUNK) {
            let target = members::table.filter(members::id.eq_any(chunk.to_vec()));
            match self {
                Self::Username(username) => diesel::update(target)
                    .set(members::username.eq(username.clone()))
                    .execute(conn)?,
                Self::Age(age) => diesel::update(target)
                    .set(members::age.eq(*age))
                    .execute(conn)?,
                Self::TeamId(team_id) => diesel::update(target)
                    .set(members::team_id.eq(*team_id))
                    .execute(conn)?,
                Self::AddAge(delta) => diesel::update(target)
                    .set(members::age.eq(members::age + *delta))
                    .execute(conn)?,
                Self::AddTeamId(delta) => diesel::update(target)
                    .set(members::team_id.eq(members::team_id + *delta))
                    .execute(conn)?,
            };
        }
        Ok(())
    }
}

impl DbMember {
    fn row(&self, team: Option<&DbTeam>, selections: &[Selection]) -> Row {
        selections.iter().fold(Row::new(), |row, selection| {
            let value = self
                .value(selection.column)
                .or_else(|| team.and_then(|team| team.value(selection.column)))
                .unwrap_or(Value::Null);
            row.with(selection.alias, value)
        })
    }
}

fn affected(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

impl QueryBackend for SqliteBackend {
    fn select_rows(
        &self,
        predicate: &Option<Predicate>,
        selections: &[Selection],
        join: &JoinSpec,
        slice: Option<Slice>,
        sort: &[SortOrder],
    ) -> RepositoryResult<Vec<Row>> {
        if let Some(column) = join.missing(selections.iter().map(|selection| selection.column)) {
            return Err(RepositoryError::no_such_column(column));
        }

        if join.includes(Entity::Team) {
            let mut items = members::table
                .left_join(teams::table)
                .into_boxed::<diesel::sqlite::Sqlite>();
            if let Some(predicate) = predicate {
                items = items.filter(member_team_condition(predicate)?);
            }
            for order in sort {
                for term in member_team_sort(order)? {
                    items = items.then_order_by(term);
                }
            }
            if let Some(slice) = slice {
                items = items.offset(slice.offset).limit(slice.limit);
            }

            let mut conn = self.conn()?;
            let rows = items.load::<(DbMember, Option<DbTeam>)>(&mut conn)?;
            return Ok(rows
                .iter()
                .map(|(member, team)| member.row(team.as_ref(), selections))
                .collect());
        }

        let mut items = members::table.into_boxed::<diesel::sqlite::Sqlite>();
        if let Some(predicate) = predicate {
            items = items.filter(member_condition(predicate)?);
        }
        for order in sort {
            for term in member_sort(order)? {
                items = items.then_order_by(term);
            }
        }
        if let Some(slice) = slice {
            items = items.offset(slice.offset).limit(slice.limit);
        }

        let mut conn = self.conn()?;
        let rows = items.load::<DbMember>(&mut conn)?;
        Ok(rows
            .iter()
            .map(|member| member.row(None, selections))
            .collect())
    }

    fn select_count(
        &self,
        predicate: &Option<Predicate>,
        join: &JoinSpec,
    ) -> RepositoryResult<i64> {
        let total = if join.includes(Entity::Team) {
            let mut items = members::table
                .left_join(teams::table)
                .into_boxed::<diesel::sqlite::Sqlite>();
            if let Some(predicate) = predicate {
                items = items.filter(member_team_condition(predicate)?);
            }
            let mut conn = self.conn()?;
            items.count().get_result::<i64>(&mut conn)?
        } else {
            let mut items = members::table.into_boxed::<diesel::sqlite::Sqlite>();
            if let Some(predicate) = predicate {
                items = items.filter(member_condition(predicate)?);
            }
            let mut conn = self.conn()?;
            items.count().get_result::<i64>(&mut conn)?
        };
        Ok(total)
    }

    /// Matching ids are read once, then every assignment is applied to
    /// them inside one transaction.
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
        let changes = assignments
            .iter()
            .map(MemberChange::try_from)
            .collect::<RepositoryResult<Vec<_>>>()?;

        let mut ids = members::table
            .select(members::id)
            .into_boxed::<diesel::sqlite::Sqlite>();
        if let Some(predicate) = predicate {
            ids = ids.filter(member_condition(predicate)?);
        }

        let mut conn = self.conn()?;
        conn.transaction::<i64, RepositoryError, _>(move |conn| {
            let ids = ids.load::<i64>(conn)?;
            for change in &changes {
                change.apply(conn, &ids)?;
            }
            Ok(affected(ids.len()))
        })
    }

    fn execute_delete(&self, predicate: &Option<Predicate>) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        let deleted = match predicate {
            Some(predicate) => diesel::delete(members::table)
                .filter(member_condition(predicate)?)
                .execute(&mut conn)?,
            None => diesel::delete(members::table).execute(&mut conn)?,
        };
        Ok(affected(deleted))
    }

    fn insert_member(&self, new_member: &NewMember) -> RepositoryResult<Member> {
        let mut conn = self.conn()?;
        let db_new_member: DbNewMember = new_member.into();
        let db_member = diesel::insert_into(members::table)
            .values(&db_new_member)
            .get_result::<DbMember>(&mut conn)?;

        Member::try_from(db_member).map_err(RepositoryError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_are_validated_before_any_statement() {
        let set = |column, value: Value| Assignment::Set { column, value };

        assert_eq!(
            MemberChange::try_from(&set(Column::MemberUsername, "x".into())).unwrap(),
            MemberChange::Username(Some("x".to_string()))
        );
        assert_eq!(
            MemberChange::try_from(&set(Column::MemberTeamId, Value::Null)).unwrap(),
            MemberChange::TeamId(None)
        );
        assert_eq!(
            MemberChange::try_from(&Assignment::Add {
                column: Column::MemberAge,
                delta: 1,
            })
            .unwrap(),
            MemberChange::AddAge(1)
        );

        for assignment in [
            set(Column::MemberAge, Value::Null),
            set(Column::MemberAge, Value::Int(i64::MAX)),
            set(Column::MemberUsername, Value::Int(1)),
            set(Column::MemberId, Value::Int(7)),
            Assignment::Add {
                column: Column::MemberAge,
                delta: i64::MIN,
            },
        ] {
            let err = MemberChange::try_from(&assignment).unwrap_err();
            assert_eq!(err.backend_kind(), Some(BackendErrorKind::ConstraintViolated));
        }

        let err = MemberChange::try_from(&set(Column::TeamName, "x".into())).unwrap_err();
        assert_eq!(err.backend_kind(), Some(BackendErrorKind::SyntaxError));
    }
}
