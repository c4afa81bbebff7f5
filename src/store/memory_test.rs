//! Tests for the in-memory table store.

use serde_json::{Value, json};

use crate::store::{
    DataAccessError, Filter, Match, MemoryStore, Operator, OrderBy, TableQuery, TableStore,
};

async fn seeded() -> MemoryStore {
    let store = MemoryStore::new().with_table("milestones");
    store
        .insert(
            "milestones",
            &[
                json!({"name": "Design", "due_date": "2025-03-01", "project_id": 1, "status": 1}),
                json!({"name": "Build", "due_date": "2025-01-10", "project_id": 1, "status": 2}),
                json!({"name": "Ship", "due_date": null, "project_id": 2, "status": 1}),
                json!({"name": "design review", "due_date": "2025-02-15", "project_id": 2, "status": 3}),
            ],
        )
        .await
        .unwrap();
    store
}

fn names(rows: &[Value]) -> Vec<&str> {
    rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
}

async fn select_names(store: &MemoryStore, query: TableQuery) -> Vec<String> {
    let rows = store.select(&query).await.unwrap();
    names(&rows).into_iter().map(str::to_string).collect()
}

#[tokio::test]
async fn test_insert_assigns_id_and_created_at() {
    let store = seeded().await;
    let rows = store.rows("milestones");
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["id"], json!(1));
    assert_eq!(rows[3]["id"], json!(4));
    assert!(rows[0]["created_at"].is_string());
}

#[tokio::test]
async fn test_insert_duplicate_id_is_rejected_without_partial_write() {
    let store = MemoryStore::new().with_table("projects");
    store
        .insert("projects", &[json!({"id": 7, "name": "A"})])
        .await
        .unwrap();

    let err = store
        .insert("projects", &[json!({"name": "B"}), json!({"id": 7, "name": "C"})])
        .await
        .unwrap_err();
    assert_eq!(err.backend_code(), Some("23505"));
    assert_eq!(store.rows("projects").len(), 1);

    // Explicit ids advance the generator.
    store.insert("projects", &[json!({"name": "D"})]).await.unwrap();
    assert_eq!(store.rows("projects")[1]["id"], json!(8));
}

#[tokio::test]
async fn test_unknown_table_is_rejected() {
    let store = MemoryStore::new();
    let err = store.select(&TableQuery::new("nope")).await.unwrap_err();
    match err {
        DataAccessError::Rejected { status, code, .. } => {
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("PGRST205"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_like_is_case_sensitive_and_ilike_is_not() {
    let store = seeded().await;
    let like = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::like("name", "%esign%")),
    )
    .await;
    assert_eq!(like, vec!["Design", "design review"]);

    let like = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::like("name", "Design%")),
    )
    .await;
    assert_eq!(like, vec!["Design"]);

    let ilike = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::ilike("name", "design%")),
    )
    .await;
    assert_eq!(ilike, vec!["Design", "design review"]);
}

#[tokio::test]
async fn test_comparisons_and_in_set() {
    let store = seeded().await;
    let due_before = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::lt("due_date", "2025-02-20")),
    )
    .await;
    // null due date is unknown, never less-than
    assert_eq!(due_before, vec!["Build", "design review"]);

    let in_set = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::in_set("status", [2, 3])),
    )
    .await;
    assert_eq!(in_set, vec!["Build", "design review"]);

    let neq = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::neq("status", 1)),
    )
    .await;
    assert_eq!(neq, vec!["Build", "design review"]);
}

#[tokio::test]
async fn test_is_null_and_negation() {
    let store = seeded().await;
    let is_null = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::is("due_date", Value::Null)),
    )
    .await;
    assert_eq!(is_null, vec!["Ship"]);

    let not_null = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::not("due_date", Operator::Is, Value::Null)),
    )
    .await;
    assert_eq!(not_null.len(), 3);

    let not_completed = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::not("status", Operator::Eq, 2)),
    )
    .await;
    assert_eq!(not_completed, vec!["Design", "Ship", "design review"]);
}

#[tokio::test]
async fn test_incomparable_values_match_neither_a_filter_nor_its_negation() {
    let store = seeded().await;
    for filter in [
        Filter::eq("status", "abc"),
        Filter::neq("status", "abc"),
        Filter::not("status", Operator::Eq, "abc"),
        Filter::in_set("status", vec![json!("abc")]),
        Filter::not("status", Operator::In, json!(["abc"])),
    ] {
        let rows = select_names(&store, TableQuery::new("milestones").filter(filter.clone())).await;
        assert!(rows.is_empty(), "{filter:?} matched {rows:?}");
    }

    let mixed = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::not("status", Operator::In, json!(["abc", 1]))),
    )
    .await;
    assert_eq!(mixed, vec!["Build", "design review"]);
}

#[tokio::test]
async fn test_disjunction_expression() {
    let store = seeded().await;
    let rows = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::or("status.eq.2,name.like.Sh*")),
    )
    .await;
    assert_eq!(rows, vec!["Build", "Ship"]);

    let nested = select_names(
        &store,
        TableQuery::new("milestones")
            .filter(Filter::or("and(project_id.eq.2,status.in.(1,3)),name.eq.Design")),
    )
    .await;
    assert_eq!(nested, vec!["Design", "Ship", "design review"]);
}

#[tokio::test]
async fn test_disjunction_is_conjunctive_with_other_filters() {
    let store = seeded().await;
    let rows = select_names(
        &store,
        TableQuery::new("milestones")
            .match_all(&Match::by("project_id", 1))
            .filter(Filter::or("status.eq.2,status.eq.3")),
    )
    .await;
    assert_eq!(rows, vec!["Build"]);
}

#[tokio::test]
async fn test_malformed_disjunction_is_rejected() {
    let store = seeded().await;
    let err = store
        .select(&TableQuery::new("milestones").filter(Filter::or("status.bogus.2")))
        .await
        .unwrap_err();
    assert_eq!(err.backend_code(), Some("PGRST100"));
}

#[tokio::test]
async fn test_custom_filter_uses_named_operator() {
    let store = seeded().await;
    let rows = select_names(
        &store,
        TableQuery::new("milestones").filter(Filter::custom("project_id", "gte", 2)),
    )
    .await;
    assert_eq!(rows, vec!["Ship", "design review"]);

    let err = store
        .select(&TableQuery::new("milestones").filter(Filter::custom("name", "fts", "x")))
        .await
        .unwrap_err();
    assert!(matches!(err, DataAccessError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn test_ordering_puts_nulls_last_ascending_first_descending() {
    let store = seeded().await;
    let asc = select_names(
        &store,
        TableQuery::new("milestones").order(OrderBy::asc("due_date")),
    )
    .await;
    assert_eq!(asc, vec!["Build", "design review", "Design", "Ship"]);

    let desc = select_names(
        &store,
        TableQuery::new("milestones").order(OrderBy::desc("due_date")),
    )
    .await;
    assert_eq!(desc, vec!["Ship", "Design", "design review", "Build"]);
}

#[tokio::test]
async fn test_projection_keeps_requested_columns() {
    let store = seeded().await;
    let rows = store
        .select(
            &TableQuery::new("milestones")
                .select("id, name")
                .match_all(&Match::by("name", "Build")),
        )
        .await
        .unwrap();
    assert_eq!(rows, vec![json!({"id": 2, "name": "Build"})]);
}

#[tokio::test]
async fn test_update_and_delete_affect_every_matching_row() {
    let store = seeded().await;
    store
        .update("milestones", &json!({"status": 2}), &Match::by("project_id", 2))
        .await
        .unwrap();
    let completed = select_names(
        &store,
        TableQuery::new("milestones").match_all(&Match::by("status", 2)),
    )
    .await;
    assert_eq!(completed, vec!["Build", "Ship", "design review"]);

    store
        .delete("milestones", &Match::by("status", 2))
        .await
        .unwrap();
    assert_eq!(names(&store.rows("milestones")), vec!["Design"]);
}
