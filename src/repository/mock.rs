//! Mock backend for exercising the repository without a store.

use mockall::mock;
use tokio_util::sync::CancellationToken;

use crate::domain::member::{Member, NewMember};
use crate::pagination::Slice;
use crate::query::columns::JoinSpec;
use crate::query::predicate::Predicate;
use crate::query::projection::{Row, Selection};
use crate::query::sort::SortOrder;
use crate::repository::errors::RepositoryResult;
use crate::repository::{Assignment, QueryBackend};

mock! {
    pub QueryBackend {}

    impl QueryBackend for QueryBackend {
        fn select_rows(
            &self,
            predicate: &Option<Predicate>,
            selections: &[Selection],
            join: &JoinSpec,
            slice: Option<Slice>,
            sort: &[SortOrder],
        ) -> RepositoryResult<Vec<Row>>;
        fn select_count(
            &self,
            predicate: &Option<Predicate>,
            join: &JoinSpec,
        ) -> RepositoryResult<i64>;
        fn execute_update(
            &self,
            assignments: &[Assignment],
            predicate: &Option<Predicate>,
        ) -> RepositoryResult<i64>;
        fn execute_delete(&self, predicate: &Option<Predicate>) -> RepositoryResult<i64>;
        fn insert_member(&self, new_member: &NewMember) -> RepositoryResult<Member>;
        fn cancel(&self, token: &CancellationToken);
        fn clear_identity_cache(&self) -> RepositoryResult<()>;
    }
}
