//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use oifind_core::{finder::Finder, model::Dataset};
use oifind_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn store() -> SqliteStore {
  let data: Dataset = serde_json::from_value(json!({
    "identities": [
      { "uid": 1, "name": "A", "enroll_middle": 2020, "oierdb_score": 90.0 },
      { "uid": 2, "name": "B", "enroll_middle": 2021, "oierdb_score": 80.0 },
    ],
    "contests": [{ "id": 1, "name": "NOI2022", "type": "NOI", "year": 2022 }],
    "records": [
      { "id": 1, "oier_uid": 1, "contest_id": 1, "score": 500.0, "province": "北京", "level": "金牌" },
    ],
  }))
  .unwrap();
  let s = SqliteStore::open_in_memory().await.unwrap();
  s.insert_dataset(&data).await.unwrap();
  s
}

async fn post_query(store: SqliteStore, body: &str) -> Response {
  let req = Request::builder()
    .method("POST")
    .uri("/query")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_owned()))
    .unwrap();
  api_router(Arc::new(store), Finder::new())
    .oneshot(req)
    .await
    .unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn names(body: &Value) -> Vec<&str> {
  body["data"]
    .as_array()
    .unwrap()
    .iter()
    .filter_map(|i| i["name"].as_str())
    .collect()
}

#[tokio::test]
async fn health_is_ok() {
  let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
  let resp = api_router(Arc::new(store().await), Finder::new())
    .oneshot(req)
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_filter_browses_all() {
  let resp = post_query(store().await, "{}").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(names(&body), vec!["A", "B"]);
  assert_eq!(body["steps"][0]["kind"], "fetch");
}

#[tokio::test]
async fn narrowing_query_returns_matches_and_steps() {
  let body = r#"{"records": [{"contest_type": ["NOI"], "province": ["北京"]}]}"#;
  let resp = post_query(store().await, body).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(names(&body), vec!["A"]);
  assert_eq!(body["steps"][0]["kind"], "group");
  assert_eq!(body["steps"][0]["strategy"], "unscoped");
}

#[tokio::test]
async fn unknown_field_is_a_bad_request() {
  let resp = post_query(store().await, r#"{"records": [{"provnce": ["北京"]}]}"#).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body = json_body(resp).await;
  assert!(body["error"].as_str().unwrap().contains("records[0]"));
}

#[tokio::test]
async fn non_mapping_is_a_bad_request() {
  let resp = post_query(store().await, "[1, 2, 3]").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failure_is_a_bad_gateway() {
  let s = store().await;
  s.execute_sql("DROP TABLE Record", &[]).await.unwrap();
  let resp = post_query(s, r#"{"records": [{"contest_type": "NOI"}]}"#).await;
  assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
  let body = json_body(resp).await;
  assert!(body["error"].as_str().is_some());
}
