//! Member search and bulk mutation over any [`QueryBackend`].

use tokio_util::sync::CancellationToken;

use crate::{
    domain::{
        member::{Member, NewMember},
        search::SearchCondition,
        types::MemberId,
    },
    dto::{member::member_projection, member_team::MemberTeamRecord},
    models::config::RepositoryConfig,
    pagination::{Page, Pageable, assemble_page},
    query::{
        builder::search_predicate,
        columns::{Column, JoinSpec},
        predicate::{Predicate, Value},
        projection::Projection,
        sort::{SortOrder, resolve_sort},
    },
    repository::{
        Assignment, BulkOutcome, MutationRepository, QueryBackend, SearchRepository,
        errors::{RepositoryError, RepositoryResult},
    },
};

/// Repository composing predicates and projections into backend reads.
#[derive(Debug, Clone)]
pub struct MemberQueryRepository<B> {
    backend: B,
    count_elision: bool,
    cancellation: Option<CancellationToken>,
}

impl<B: QueryBackend> MemberQueryRepository<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            count_elision: true,
            cancellation: None,
        }
    }

    pub fn with_config(backend: B, config: &RepositoryConfig) -> Self {
        Self::new(backend).with_count_elision(config.count_elision)
    }

    pub fn with_count_elision(mut self, enabled: bool) -> Self {
        self.count_elision = enabled;
        self
    }

    /// Aborts reads and writes once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_not_cancelled(&self) -> RepositoryResult<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => {
                log::warn!("member query cancelled by caller");
                self.backend.cancel(token);
                Err(RepositoryError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    /// Runs a read against the backend. A cancellation observed while the
    /// read was in flight discards its result.
    fn read<R>(&self, call: impl FnOnce(&B) -> RepositoryResult<R>) -> RepositoryResult<R> {
        self.ensure_not_cancelled()?;
        let result = call(&self.backend);
        self.ensure_not_cancelled()?;
        result
    }

    /// Runs a write. Once the statement has been issued its outcome stands.
    fn write<R>(&self, call: impl FnOnce(&B) -> RepositoryResult<R>) -> RepositoryResult<R> {
        self.ensure_not_cancelled()?;
        call(&self.backend)
    }

    fn fetch<T>(
        &self,
        projection: &Projection<T>,
        predicate: &Option<Predicate>,
        join: &JoinSpec,
        request: Option<&Pageable>,
        sort: &[SortOrder],
    ) -> RepositoryResult<Vec<T>> {
        let slice = request.map(Pageable::slice);
        let rows = self.read(|backend| {
            backend.select_rows(predicate, projection.selections(), join, slice, sort)
        })?;
        projection.map_rows(rows)
    }

    /// Validates the request and resolves its sort against the projection.
    /// Unsorted pages fall back to member id order so that pages are stable.
    fn prepare_page<T>(
        &self,
        request: &Pageable,
        projection: &Projection<T>,
    ) -> RepositoryResult<Vec<SortOrder>> {
        request.validate()?;
        let sort = resolve_sort(&request.sort, projection.selections())?;
        if sort.is_empty() {
            return Ok(vec![SortOrder::asc(Column::MemberId)]);
        }
        Ok(sort)
    }
}

impl<B: QueryBackend> SearchRepository for MemberQueryRepository<B> {
    fn find_all(&self) -> RepositoryResult<Vec<Member>> {
        let projection = member_projection()?;
        self.fetch(&projection, &None, &JoinSpec::member_only(), None, &[])
    }

    fn find_by_id(&self, id: MemberId) -> RepositoryResult<Option<Member>> {
        let projection = member_projection()?;
        let predicate = Some(Predicate::eq(Column::MemberId, id.get()));
        let found = self.fetch(
            &projection,
            &predicate,
            &JoinSpec::member_only(),
            None,
            &[],
        )?;
        Ok(found.into_iter().next())
    }

    fn find_by_username(&self, username: &str) -> RepositoryResult<Vec<Member>> {
        let projection = member_projection()?;
        let predicate = Some(Predicate::eq(Column::MemberUsername, username));
        self.fetch(
            &projection,
            &predicate,
            &JoinSpec::member_only(),
            None,
            &[],
        )
    }

    fn search_flat(&self, condition: &SearchCondition) -> RepositoryResult<Vec<MemberTeamRecord>> {
        let projection = MemberTeamRecord::projection()?;
        let predicate = search_predicate(condition);
        self.fetch(
            &projection,
            &predicate,
            &JoinSpec::member_with_team(),
            None,
            &[],
        )
    }

    fn search_page_simple(
        &self,
        condition: &SearchCondition,
        page: &Pageable,
    ) -> RepositoryResult<Page<MemberTeamRecord>> {
        let projection = MemberTeamRecord::projection()?;
        let sort = self.prepare_page(page, &projection)?;
        let predicate = search_predicate(condition);
        let join = JoinSpec::member_with_team();

        let total = self.read(|backend| backend.select_count(&predicate, &join))?;
        let content = if total > 0 {
            self.fetch(
                &projection,
                &predicate,
                &join,
                Some(page),
                &sort,
            )?
        } else {
            Vec::new()
        };
        Ok(Page::new(content, page, total))
    }

    fn search_page_complex(
        &self,
        condition: &SearchCondition,
        page: &Pageable,
    ) -> RepositoryResult<Page<MemberTeamRecord>> {
        let projection = MemberTeamRecord::projection()?;
        let sort = self.prepare_page(page, &projection)?;
        let predicate = search_predicate(condition);

        let content = self.fetch(
            &projection,
            &predicate,
            &JoinSpec::member_with_team(),
            Some(page),
            &sort,
        )?;

        let count_join = JoinSpec::covering(
            predicate
                .as_ref()
                .map(Predicate::columns)
                .unwrap_or_default(),
        );
        assemble_page(content, page, self.count_elision, || {
            self.read(|backend| backend.select_count(&predicate, &count_join))
        })
    }

    fn invalidate_cache(&self) -> RepositoryResult<()> {
        self.backend.clear_identity_cache()
    }
}

impl<B: QueryBackend> MutationRepository for MemberQueryRepository<B> {
    fn save(&self, new_member: &NewMember) -> RepositoryResult<Member> {
        let member = self.write(|backend| backend.insert_member(new_member))?;
        log::debug!("saved member {}", member.id);
        Ok(member)
    }

    fn bulk_rename_under_age(&self, username: &str, max_age: i32) -> RepositoryResult<BulkOutcome> {
        let assignments = [Assignment::Set {
            column: Column::MemberUsername,
            value: Value::from(username),
        }];
        let predicate = Some(Predicate::lt(Column::MemberAge, max_age));
        let affected = self.write(|backend| backend.execute_update(&assignments, &predicate))?;
        log::info!("renamed {affected} members younger than {max_age}");
        Ok(BulkOutcome::new(affected))
    }

    fn bulk_age_increment(&self, delta: i32) -> RepositoryResult<BulkOutcome> {
        let assignments = [Assignment::Add {
            column: Column::MemberAge,
            delta: delta.into(),
        }];
        let affected = self.write(|backend| backend.execute_update(&assignments, &None))?;
        log::info!("shifted age of {affected} members by {delta}");
        Ok(BulkOutcome::new(affected))
    }

    fn bulk_delete_above(&self, min_age: i32) -> RepositoryResult<BulkOutcome> {
        let predicate = Some(Predicate::gt(Column::MemberAge, min_age));
        let affected = self.write(|backend| backend.execute_delete(&predicate))?;
        log::info!("deleted {affected} members older than {min_age}");
        Ok(BulkOutcome::new(affected))
    }
}
