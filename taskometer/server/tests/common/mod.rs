#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use taskometer_server::storage::{
    Blob, BlobStore, ObjectStoreBlobStore, ObjectVersion, StorageError, WriteCondition,
};
use taskometer_server::web::AppState;
use tower::ServiceExt;

mockall::mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl BlobStore for Store {
        async fn get(&self, key: &str) -> Result<Blob, StorageError>;
        async fn put(&self, key: &str, body: Bytes) -> Result<ObjectVersion, StorageError>;
        async fn put_if(
            &self,
            key: &str,
            body: Bytes,
            condition: WriteCondition,
        ) -> Result<ObjectVersion, StorageError>;
        async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
        async fn delete(&self, key: &str) -> Result<(), StorageError>;
        async fn check_bucket(&self) -> Result<(), StorageError>;
    }
}

/// A storage failure as the backend would report an unreachable bucket.
pub fn backend_error() -> StorageError {
    StorageError::Backend(object_store::Error::Generic {
        store: "test",
        source: "connection refused".into(),
    })
}

/// State backed by a fresh in-memory object store.
pub fn in_memory_state() -> Arc<AppState> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    Arc::new(AppState::new(Arc::new(ObjectStoreBlobStore::in_memory())))
}

/// State backed by the given mock store.
pub fn mock_state(store: MockStore) -> Arc<AppState> {
    let _ = tracing_subscriber::fmt().try_init();
    Arc::new(AppState::new(Arc::new(store)))
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Status, headers and decoded JSON body of a response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&body).into()));

    TestResponse {
        status,
        headers,
        body,
    }
}

/// HTTP response snapshot for testing endpoints.
#[derive(Debug, Serialize)]
pub struct HttpResponseSnapshot {
    test_context: String,
    status: u16,
    headers: BTreeMap<String, String>,
    body: serde_json::Value,
}

impl HttpResponseSnapshot {
    pub fn new(response: &TestResponse, test_context: &str) -> Self {
        Self {
            test_context: test_context.to_string(),
            status: response.status.as_u16(),
            headers: filter_variable_headers(&response.headers),
            body: response.body.clone(),
        }
    }
}

/// Filter out variable headers from response headers for snapshot testing.
fn filter_variable_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let variable_headers = ["date", "content-length", "x-request-id", "vary"];

    headers
        .iter()
        .filter_map(|(name, value)| {
            let name_str = name.as_str().to_lowercase();
            if variable_headers.contains(&name_str.as_str()) {
                None
            } else {
                value.to_str().ok().map(|v| (name_str, v.to_string()))
            }
        })
        .collect()
}
