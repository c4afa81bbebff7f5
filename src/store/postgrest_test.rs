//! Tests for the PostgREST store against an in-process HTTP server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::config::StoreConfig;
use crate::store::postgrest::{render_filter, render_list, render_value};
use crate::store::{
    DataAccessError, DataResult, Filter, Match, Operator, OrderBy, PostgrestStore, SelectOptions,
    TableAdapter,
};

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    pairs: Vec<(String, String)>,
    headers: HeaderMap,
    body: String,
}

#[derive(Clone)]
struct Recorder {
    requests: Arc<Mutex<Vec<Recorded>>>,
    status: StatusCode,
    reply: String,
}

impl Recorder {
    fn last(&self) -> Recorded {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

async fn record(
    State(state): State<Recorder>,
    method: Method,
    uri: Uri,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        pairs,
        headers,
        body,
    });
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.reply.clone(),
    )
}

/// Spawn a test HTTP server answering every request with `status`/`reply`.
async fn spawn_test_server(status: StatusCode, reply: &str) -> (String, Recorder) {
    let recorder = Recorder {
        requests: Arc::new(Mutex::new(Vec::new())),
        status,
        reply: reply.to_string(),
    };
    let app = Router::new()
        .fallback(record)
        .with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorder)
}

fn store_for(url: &str, api_key: Option<&str>) -> PostgrestStore {
    PostgrestStore::new(&StoreConfig {
        url: url.to_string(),
        api_key: api_key.map(str::to_string),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// =============================================================================
// Wire format
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_select_renders_query_pairs_in_order() {
    let (url, recorder) = spawn_test_server(
        StatusCode::OK,
        r#"[{"id":1,"name":"Design","due_date":"2025-01-10"}]"#,
    )
    .await;
    let adapter = TableAdapter::new(store_for(&url, Some("anon-key")));

    let rows: Vec<Value> = adapter
        .select(
            "milestones",
            SelectOptions::new()
                .matching(Match::by("project_id", 1))
                .filter(Filter::gte("due_date", "2025-01-01"))
                .filter(Filter::like("name", "%Tracker%"))
                .filter(Filter::or("status.eq.1,status.eq.2"))
                .order_by(OrderBy::asc("due_date")),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let request = recorder.last();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/rest/v1/milestones");
    assert_eq!(
        request.pairs,
        pairs(&[
            ("select", "*"),
            ("project_id", "eq.1"),
            ("due_date", "gte.2025-01-01"),
            ("name", "like.%Tracker%"),
            ("or", "(status.eq.1,status.eq.2)"),
            ("order", "due_date.asc"),
        ])
    );
    assert_eq!(request.headers["apikey"], "anon-key");
    assert_eq!(request.headers["authorization"], "Bearer anon-key");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_auth_headers_without_api_key() {
    let (url, recorder) = spawn_test_server(StatusCode::OK, "[]").await;
    let adapter = TableAdapter::new(store_for(&format!("{}/", url), None));

    let rows: Vec<Value> = adapter
        .select("projects", SelectOptions::new().columns("id,name"))
        .await
        .unwrap();
    assert!(rows.is_empty());

    let request = recorder.last();
    assert_eq!(request.path, "/rest/v1/projects");
    assert_eq!(request.pairs, pairs(&[("select", "id,name")]));
    assert!(!request.headers.contains_key("apikey"));
    assert!(!request.headers.contains_key("authorization"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_insert_posts_single_record_with_minimal_return() {
    let (url, recorder) = spawn_test_server(StatusCode::CREATED, "").await;
    let adapter = TableAdapter::new(store_for(&url, Some("k")));

    adapter
        .insert("projects", &json!({"name": "Alpha", "description": "First"}))
        .await
        .unwrap();

    let request = recorder.last();
    assert_eq!(request.method, Method::POST);
    assert!(request.pairs.is_empty());
    assert_eq!(request.headers["prefer"], "return=minimal");
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body, json!({"name": "Alpha", "description": "First"}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_insert_posts_array_with_union_of_columns() {
    let (url, recorder) = spawn_test_server(StatusCode::CREATED, "").await;
    let adapter = TableAdapter::new(store_for(&url, None));

    adapter
        .insert(
            "projects",
            &json!([{"name": "A", "description": "x"}, {"name": "B"}]),
        )
        .await
        .unwrap();

    let request = recorder.last();
    assert_eq!(request.pairs, pairs(&[("columns", "\"description\",\"name\"")]));
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body, json!([{"name": "A", "description": "x"}, {"name": "B"}]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_patches_matching_rows() {
    let (url, recorder) = spawn_test_server(StatusCode::NO_CONTENT, "").await;
    let adapter = TableAdapter::new(store_for(&url, None));

    adapter
        .update(
            "milestones",
            &json!({"status": 2}),
            &Match::by("id", 5).and("project_id", 1),
        )
        .await
        .unwrap();

    let request = recorder.last();
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(request.path, "/rest/v1/milestones");
    assert_eq!(request.pairs, pairs(&[("id", "eq.5"), ("project_id", "eq.1")]));
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body, json!({"status": 2}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remove_deletes_by_match() {
    let (url, recorder) = spawn_test_server(StatusCode::NO_CONTENT, "").await;
    let adapter = TableAdapter::new(store_for(&url, None));

    adapter
        .remove("milestones", &Match::by("project_id", 3))
        .await
        .unwrap();

    let request = recorder.last();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.pairs, pairs(&[("project_id", "eq.3")]));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_error_body_is_decoded() {
    let (url, _recorder) = spawn_test_server(
        StatusCode::CONFLICT,
        r#"{"code":"23505","message":"duplicate key value violates unique constraint \"projects_pkey\"","details":"Key (id)=(1) already exists.","hint":null}"#,
    )
    .await;
    let adapter = TableAdapter::new(store_for(&url, None));

    let err = adapter
        .insert("projects", &json!({"id": 1, "name": "Dup"}))
        .await
        .unwrap_err();
    match err {
        DataAccessError::Rejected {
            status,
            code,
            message,
            details,
            hint,
        } => {
            assert_eq!(status, 409);
            assert_eq!(code.as_deref(), Some("23505"));
            assert!(message.contains("duplicate key"));
            assert_eq!(details.as_deref(), Some("Key (id)=(1) already exists."));
            assert_eq!(hint, None);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unstructured_error_body_is_kept_verbatim() {
    let (url, _recorder) = spawn_test_server(StatusCode::BAD_GATEWAY, "upstream down").await;
    let adapter = TableAdapter::new(store_for(&url, None));

    let result: DataResult<Vec<Value>> = adapter.select("projects", SelectOptions::new()).await;
    let err = result.unwrap_err();
    match &err {
        DataAccessError::Rejected { status, message, .. } => {
            assert_eq!(*status, 502);
            assert_eq!(message, "upstream down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_success_with_unexpected_body_is_invalid_response() {
    let (url, _recorder) = spawn_test_server(StatusCode::OK, r#"{"not":"a list"}"#).await;
    let adapter = TableAdapter::new(store_for(&url, None));

    let result: DataResult<Vec<Value>> = adapter.select("projects", SelectOptions::new()).await;
    assert!(matches!(
        result,
        Err(DataAccessError::InvalidResponse { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_store_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let adapter = TableAdapter::new(store_for(&format!("http://{}", addr), None));
    let err = adapter
        .remove("projects", &Match::by("id", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DataAccessError::Connection { .. }));
    assert!(err.is_transient());
}

// =============================================================================
// Filter rendering
// =============================================================================

#[test]
fn test_render_scalars() {
    assert_eq!(render_value(&json!("2025-01-10")), "2025-01-10");
    assert_eq!(render_value(&json!(2)), "2");
    assert_eq!(render_value(&json!(true)), "true");
    assert_eq!(render_value(&Value::Null), "null");
}

#[test]
fn test_render_in_list_quotes_reserved_characters() {
    assert_eq!(render_list(&[json!(1), json!(2)]), "(1,2)");
    assert_eq!(
        render_list(&[json!("a,b"), json!("plain"), json!("say \"hi\"")]),
        r#"("a,b",plain,"say \"hi\"")"#
    );
}

#[test]
fn test_render_each_filter_form() {
    let cases = [
        (Filter::neq("status", 2), ("status", "neq.2")),
        (Filter::gt("id", 10), ("id", "gt.10")),
        (Filter::lte("due_date", "2025-12-31"), ("due_date", "lte.2025-12-31")),
        (Filter::ilike("name", "%tracker%"), ("name", "ilike.%tracker%")),
        (Filter::is("description", Value::Null), ("description", "is.null")),
        (Filter::in_set("status", [1, 2]), ("status", "in.(1,2)")),
        (
            Filter::not("status", Operator::In, json!([1, 3])),
            ("status", "not.in.(1,3)"),
        ),
        (
            Filter::not("description", Operator::Is, Value::Null),
            ("description", "not.is.null"),
        ),
        (Filter::or("(id.eq.1,id.eq.2)"), ("or", "(id.eq.1,id.eq.2)")),
        (
            Filter::custom("tags", "cs", json!(["a", "b c"])),
            ("tags", "cs.{a,\"b c\"}"),
        ),
    ];
    for (filter, (key, value)) in cases {
        assert_eq!(render_filter(&filter), (key.to_string(), value.to_string()));
    }
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rows_decode_into_caller_type() {
    let (url, _recorder) =
        spawn_test_server(StatusCode::OK, r#"[{"name":"Alpha"},{"name":"Beta"}]"#).await;
    let adapter = TableAdapter::new(store_for(&url, None));

    let rows: Vec<Named> = adapter
        .select("projects", SelectOptions::new().columns("name"))
        .await
        .unwrap();
    let names: Vec<String> = rows.into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
}
