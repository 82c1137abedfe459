use tokio_util::sync::CancellationToken;

use crate::{
    domain::{
        member::{Member, NewMember},
        search::SearchCondition,
        types::MemberId,
    },
    dto::member_team::MemberTeamRecord,
    pagination::{Page, Pageable, Slice},
    query::{
        columns::{Column, JoinSpec},
        predicate::{Predicate, Value},
        projection::{Row, Selection},
        sort::SortOrder,
    },
    repository::errors::{CacheStale, RepositoryResult},
};

pub mod errors;
#[cfg(feature = "sqlite")]
pub mod expressions;
pub mod member;
pub mod memory;
#[cfg(any(test, feature = "test-mocks"))]
pub mod mock;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use member::MemberQueryRepository;
pub use memory::MemoryBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

/// One `SET` clause of a bulk update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    Set { column: Column, value: Value },
    /// `column = column + delta`
    Add { column: Column, delta: i64 },
}

/// The relational store, as seen by the repository.
///
/// Implementations must tolerate concurrent calls; each call owns whatever
/// connection or lock it takes and releases it before returning.
pub trait QueryBackend: Send + Sync {
    fn select_rows(
        &self,
        predicate: &Option<Predicate>,
        selections: &[Selection],
        join: &JoinSpec,
        slice: Option<Slice>,
        sort: &[SortOrder],
    ) -> RepositoryResult<Vec<Row>>;

    fn select_count(&self, predicate: &Option<Predicate>, join: &JoinSpec)
    -> RepositoryResult<i64>;

    fn execute_update(
        &self,
        assignments: &[Assignment],
        predicate: &Option<Predicate>,
    ) -> RepositoryResult<i64>;

    fn execute_delete(&self, predicate: &Option<Predicate>) -> RepositoryResult<i64>;

    /// Persists a new member and returns it with its generated id.
    fn insert_member(&self, new_member: &NewMember) -> RepositoryResult<Member>;

    /// Called once the repository observes `token` cancelled, so a backend
    /// holding in-flight work can abort it. Blocking backends finish each
    /// call before returning and have nothing to abort.
    fn cancel(&self, _token: &CancellationToken) {}

    /// Drops entities the backend keeps between reads. Backends without an
    /// identity cache have nothing to do.
    fn clear_identity_cache(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

pub trait SearchRepository {
    fn find_all(&self) -> RepositoryResult<Vec<Member>>;
    fn find_by_id(&self, id: MemberId) -> RepositoryResult<Option<Member>>;
    fn find_by_username(&self, username: &str) -> RepositoryResult<Vec<Member>>;
    fn search_flat(&self, condition: &SearchCondition) -> RepositoryResult<Vec<MemberTeamRecord>>;
    fn search_page_simple(
        &self,
        condition: &SearchCondition,
        page: &Pageable,
    ) -> RepositoryResult<Page<MemberTeamRecord>>;
    fn search_page_complex(
        &self,
        condition: &SearchCondition,
        page: &Pageable,
    ) -> RepositoryResult<Page<MemberTeamRecord>>;
    fn invalidate_cache(&self) -> RepositoryResult<()>;
}

/// Result of a bulk statement. The rows were changed in the store directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "bulk mutations leave the identity cache stale"]
pub struct BulkOutcome {
    pub affected: i64,
    pub advisory: CacheStale,
}

impl BulkOutcome {
    pub fn new(affected: i64) -> Self {
        Self {
            affected,
            advisory: CacheStale,
        }
    }
}

pub trait MutationRepository {
    /// Inserts one member through the backend.
    fn save(&self, new_member: &NewMember) -> RepositoryResult<Member>;
    /// Renames every member younger than `max_age`.
    fn bulk_rename_under_age(&self, username: &str, max_age: i32) -> RepositoryResult<BulkOutcome>;
    fn bulk_age_increment(&self, delta: i32) -> RepositoryResult<BulkOutcome>;
    /// Deletes every member older than `min_age`.
    fn bulk_delete_above(&self, min_age: i32) -> RepositoryResult<BulkOutcome>;
}
