#![cfg(feature = "sqlite")]

use std::thread;

use member_query::domain::member::NewMember;
use member_query::domain::search::SearchCondition;
use member_query::domain::types::{MemberId, TeamId};
use member_query::dto::{MemberDto, MemberTeamRecord};
use member_query::pagination::Pageable;
use member_query::query::columns::{Column, JoinSpec};
use member_query::query::predicate::{Predicate, Value};
use member_query::query::sort::SortField;
use member_query::repository::errors::{BackendErrorKind, RepositoryError};
use member_query::repository::{
    MemberQueryRepository, MutationRepository, QueryBackend, SearchRepository,
};

mod common;

fn usernames(records: &[MemberTeamRecord]) -> Vec<Option<&str>> {
    records
        .iter()
        .map(|record| record.username.as_deref())
        .collect()
}

#[test]
fn test_search_flat_without_criteria_returns_every_member() {
    let test_db = common::TestDb::new("test_search_flat_without_criteria.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let records = repo.search_flat(&SearchCondition::new()).unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|record| record.team_name.is_some()));
}

#[test]
fn test_search_flat_by_username() {
    let test_db = common::TestDb::new("test_search_flat_by_username.db");
    let (backend, fixture) = test_db.seeded();
    let repo = MemberQueryRepository::new(backend);

    let records = repo
        .search_flat(&SearchCondition::new().username("member1"))
        .unwrap();
    assert_eq!(
        records,
        vec![MemberTeamRecord {
            member_id: fixture.members[0].id.get(),
            username: Some("member1".to_string()),
            age: 10,
            team_id: Some(fixture.teams[0].id.get()),
            team_name: Some("teamA".to_string()),
        }]
    );
}

#[test]
fn test_search_flat_combines_criteria() {
    let test_db = common::TestDb::new("test_search_flat_combines_criteria.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let records = repo
        .search_flat(&SearchCondition::new().team_name("teamB").age_goe(35))
        .unwrap();
    assert_eq!(usernames(&records), vec![Some("member4")]);

    let records = repo
        .search_flat(&SearchCondition::new().age_goe(15).age_loe(25))
        .unwrap();
    assert_eq!(usernames(&records), vec![Some("member2")]);

    let records = repo
        .search_flat(&SearchCondition::new().age_goe(30).age_loe(20))
        .unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_blank_criteria_are_ignored() {
    let test_db = common::TestDb::new("test_blank_criteria_are_ignored.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let records = repo
        .search_flat(&SearchCondition::new().username("").team_name("   "))
        .unwrap();
    assert_eq!(records.len(), 4);
}

#[test]
fn test_members_without_team_are_kept() {
    let test_db = common::TestDb::new("test_members_without_team_are_kept.db");
    let backend = test_db.seeded_backend();
    backend
        .insert_member(&NewMember::named("loner", 50))
        .unwrap();
    let repo = MemberQueryRepository::new(backend);

    let records = repo
        .search_flat(&SearchCondition::new().username("loner"))
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].team_id, None);
    assert_eq!(records[0].team_name, None);
}

#[test]
fn test_search_page_simple() {
    let test_db = common::TestDb::new("test_search_page_simple.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let page = repo
        .search_page_simple(&SearchCondition::new(), &Pageable::new(0, 2))
        .unwrap();
    assert_eq!(usernames(&page.content), vec![Some("member1"), Some("member2")]);
    assert_eq!(page.total, 4);
    assert_eq!(page.total_pages(), 2);
    assert!(page.has_next);

    let page = repo
        .search_page_simple(&SearchCondition::new().username("nobody"), &Pageable::new(0, 2))
        .unwrap();
    assert!(page.content.is_empty());
    assert_eq!(page.total, 0);
}

#[test]
fn test_search_page_complex_last_page() {
    let test_db = common::TestDb::new("test_search_page_complex_last_page.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let page = repo
        .search_page_complex(&SearchCondition::new(), &Pageable::new(2, 10))
        .unwrap();
    assert_eq!(usernames(&page.content), vec![Some("member3"), Some("member4")]);
    assert_eq!(page.total, 4);
    assert!(!page.has_next);
}

#[test]
fn test_simple_and_complex_pages_agree() {
    let test_db = common::TestDb::new("test_simple_and_complex_pages_agree.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());
    let condition = SearchCondition::new().team_name("teamA");

    for request in [Pageable::new(0, 1), Pageable::new(1, 1), Pageable::new(0, 10)] {
        let simple = repo.search_page_simple(&condition, &request).unwrap();
        let complex = repo.search_page_complex(&condition, &request).unwrap();
        assert_eq!(simple, complex);
    }
}

#[test]
fn test_sort_with_nulls_last() {
    let test_db = common::TestDb::new("test_sort_with_nulls_last.db");
    let backend = test_db.seeded_backend();
    for username in [None, Some("member5"), Some("member6")] {
        backend
            .insert_member(&NewMember::new(username.map(str::to_string), 100, None))
            .unwrap();
    }
    let repo = MemberQueryRepository::new(backend);

    let request = Pageable::new(0, 3)
        .sorted_by(SortField::desc("age"))
        .sorted_by(SortField::asc("username").nulls_last());
    let page = repo
        .search_page_complex(&SearchCondition::new(), &request)
        .unwrap();
    assert_eq!(
        usernames(&page.content),
        vec![Some("member5"), Some("member6"), None]
    );
    assert_eq!(page.total, 7);
}

#[test]
fn test_unknown_sort_field_is_rejected() {
    let test_db = common::TestDb::new("test_unknown_sort_field_is_rejected.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let request = Pageable::new(0, 3).sorted_by(SortField::asc("salary"));
    let err = repo
        .search_page_simple(&SearchCondition::new(), &request)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidSort(_)));
}

#[test]
fn test_find_all_and_by_username() {
    let test_db = common::TestDb::new("test_find_all_and_by_username.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let members = repo.find_all().unwrap();
    assert_eq!(members.len(), 4);
    assert!(members.iter().all(|member| member.team_id.is_some()));

    let found = repo.find_by_username("member3").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].age, 30);
    assert!(repo.find_by_username("nobody").unwrap().is_empty());
}

#[test]
fn test_find_by_id() {
    let test_db = common::TestDb::new("test_find_by_id.db");
    let (backend, fixture) = test_db.seeded();
    let repo = MemberQueryRepository::new(backend);

    let member3 = &fixture.members[2];
    assert_eq!(repo.find_by_id(member3.id).unwrap().as_ref(), Some(member3));
    assert_eq!(repo.find_by_id(MemberId::new(999).unwrap()).unwrap(), None);
}

#[test]
fn test_save_assigns_ids_and_is_searchable() {
    let test_db = common::TestDb::new("test_save.db");
    let (backend, fixture) = test_db.seeded();
    let repo = MemberQueryRepository::new(backend);

    let saved = repo
        .save(&NewMember::named("member5", 50).in_team(fixture.teams[1].id))
        .unwrap();
    assert!(fixture.members.iter().all(|member| member.id < saved.id));
    assert_eq!(repo.find_by_id(saved.id).unwrap(), Some(saved.clone()));

    let records = repo
        .search_flat(&SearchCondition::new().team_name("teamB"))
        .unwrap();
    assert_eq!(
        usernames(&records),
        vec![Some("member3"), Some("member4"), Some("member5")]
    );

    let err = repo
        .save(&NewMember::named("ghost", 1).in_team(TeamId::new(42).unwrap()))
        .unwrap_err();
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::ConstraintViolated));
}

#[test]
fn test_age_overflow_is_a_constraint_violation() {
    let test_db = common::TestDb::new("test_age_overflow.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let err = repo.bulk_age_increment(i32::MAX).unwrap_err();
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::ConstraintViolated));
    let ages: Vec<i32> = repo.find_all().unwrap().iter().map(|m| m.age).collect();
    assert_eq!(ages, vec![10, 20, 30, 40]);
}

#[test]
fn test_team_columns_outside_the_source_fail_as_syntax_errors() {
    let test_db = common::TestDb::new("test_team_columns_outside_source.db");
    let backend = test_db.seeded_backend();

    let err = backend
        .select_count(
            &Some(Predicate::eq(Column::TeamName, "teamA")),
            &JoinSpec::member_only(),
        )
        .unwrap_err();
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::SyntaxError));

    let err = backend
        .execute_delete(&Some(Predicate::eq(Column::TeamId, 1)))
        .unwrap_err();
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::SyntaxError));
}

#[test]
fn test_null_comparisons_match_nothing() {
    let test_db = common::TestDb::new("test_null_comparisons.db");
    let backend = test_db.seeded_backend();
    backend.insert_member(&NewMember::new(None, 60, None)).unwrap();

    let count = |predicate: Predicate| {
        backend
            .select_count(&Some(predicate), &JoinSpec::member_with_team())
            .unwrap()
    };
    assert_eq!(count(Predicate::eq(Column::MemberUsername, Value::Null)), 0);
    assert_eq!(count(Predicate::eq(Column::MemberUsername, Value::Null).not()), 0);
    assert_eq!(count(Predicate::is_null(Column::MemberUsername)), 1);
    assert_eq!(count(Predicate::is_null(Column::TeamName)), 1);
    assert_eq!(count(Predicate::eq(Column::TeamName, "teamA").not()), 2);
    assert_eq!(count(Predicate::lt(Column::MemberAge, i64::MAX)), 5);
}

#[test]
fn test_dto_projection_reads_username_and_age() {
    let test_db = common::TestDb::new("test_dto_projection.db");
    let backend = test_db.seeded_backend();
    let projection = MemberDto::projection().unwrap();

    let rows = backend
        .select_rows(&None, projection.selections(), &JoinSpec::member_only(), None, &[])
        .unwrap();
    let dtos = projection.map_rows(rows).unwrap();
    assert_eq!(dtos.len(), 4);
    assert_eq!(dtos[0].username.as_deref(), Some("member1"));
    assert_eq!(dtos[0].age, 10);
}

#[test]
fn test_bulk_mutations() {
    let test_db = common::TestDb::new("test_bulk_mutations.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    let outcome = repo.bulk_rename_under_age("nonmember", 28).unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(repo.find_by_username("nonmember").unwrap().len(), 2);

    let outcome = repo.bulk_age_increment(1).unwrap();
    assert_eq!(outcome.affected, 4);

    let outcome = repo.bulk_delete_above(18).unwrap();
    assert_eq!(outcome.affected, 3);
    let remaining = repo.find_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].age, 11);
}

#[test]
fn test_member_in_missing_team_violates_constraint() {
    let test_db = common::TestDb::new("test_member_in_missing_team.db");
    let backend = test_db.backend();

    let err = backend
        .insert_member(&NewMember::named("ghost", 1).in_team(TeamId::new(42).unwrap()))
        .unwrap_err();
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::ConstraintViolated));
}

#[test]
fn test_concurrent_searches_share_the_pool() {
    let test_db = common::TestDb::new("test_concurrent_searches.db");
    let repo = MemberQueryRepository::new(test_db.seeded_backend());

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = &repo;
                scope.spawn(move || {
                    let condition = SearchCondition::new().age_goe(10 * (i % 4 + 1));
                    repo.search_page_complex(&condition, &Pageable::new(0, 10))
                        .unwrap()
                        .total
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), 4 - (i as i64 % 4));
        }
    });
}
