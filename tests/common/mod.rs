#![allow(dead_code)]

use member_query::domain::member::{Member, NewMember, NewTeam, Team};
use member_query::repository::{MemoryBackend, QueryBackend};
use member_query::repository::errors::RepositoryResult;

/// Backends that can be seeded with fixture rows.
pub trait Seed {
    fn add_team(&self, new_team: &NewTeam) -> RepositoryResult<Team>;
    fn add_member(&self, new_member: &NewMember) -> RepositoryResult<Member>;
}

impl Seed for MemoryBackend {
    fn add_team(&self, new_team: &NewTeam) -> RepositoryResult<Team> {
        self.insert_team(new_team)
    }

    fn add_member(&self, new_member: &NewMember) -> RepositoryResult<Member> {
        QueryBackend::insert_member(self, new_member)
    }
}

#[cfg(feature = "sqlite")]
impl Seed for member_query::repository::SqliteBackend {
    fn add_team(&self, new_team: &NewTeam) -> RepositoryResult<Team> {
        self.insert_team(new_team)
    }

    fn add_member(&self, new_member: &NewMember) -> RepositoryResult<Member> {
        QueryBackend::insert_member(self, new_member)
    }
}

/// Rows written by [`seed_fixture`].
pub struct Fixture {
    pub teams: Vec<Team>,
    pub members: Vec<Member>,
}

/// teamA: member1 (10), member2 (20); teamB: member3 (30), member4 (40).
pub fn seed_fixture(backend: &impl Seed) -> Fixture {
    let team_a = backend.add_team(&NewTeam::new("teamA")).unwrap();
    let team_b = backend.add_team(&NewTeam::new("teamB")).unwrap();
    let members = [
        ("member1", 10, &team_a),
        ("member2", 20, &team_a),
        ("member3", 30, &team_b),
        ("member4", 40, &team_b),
    ]
    .into_iter()
    .map(|(name, age, team)| {
        backend
            .add_member(&NewMember::named(name, age).in_team(team.id))
            .unwrap()
    })
    .collect();
    Fixture {
        teams: vec![team_a, team_b],
        members,
    }
}

pub fn seeded_memory() -> MemoryBackend {
    let backend = MemoryBackend::new();
    seed_fixture(&backend);
    backend
}

#[cfg(feature = "sqlite")]
pub use sqlite::TestDb;

#[cfg(feature = "sqlite")]
mod sqlite {
    use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
    use member_query::db::{DbPool, establish_connection_pool};
    use member_query::models::config::RepositoryConfig;
    use member_query::repository::SqliteBackend;
    use tempfile::TempDir;

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    /// A migrated SQLite database in a temporary directory, removed on drop.
    pub struct TestDb {
        _dir: TempDir,
        pool: DbPool,
    }

    impl TestDb {
        pub fn new(name: &str) -> Self {
            let dir = tempfile::tempdir().expect("create temp dir");
            let config = RepositoryConfig {
                database_url: dir.path().join(name).to_string_lossy().into_owned(),
                count_elision: true,
                pool_size: 4,
                default_page_size: 20,
            };
            let pool = establish_connection_pool(&config).expect("build pool");
            let mut conn = pool.get().expect("get connection");
            conn.run_pending_migrations(MIGRATIONS)
                .expect("run migrations");
            Self { _dir: dir, pool }
        }

        pub fn pool(&self) -> &DbPool {
            &self.pool
        }

        pub fn backend(&self) -> SqliteBackend {
            SqliteBackend::new(self.pool.clone())
        }

        pub fn seeded_backend(&self) -> SqliteBackend {
            self.seeded().0
        }

        pub fn seeded(&self) -> (SqliteBackend, super::Fixture) {
            let backend = self.backend();
            let fixture = super::seed_fixture(&backend);
            (backend, fixture)
        }
    }
}
