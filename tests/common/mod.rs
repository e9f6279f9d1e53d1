//! Shared fixtures for the HTTP-level tests.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use resource_engine::{
    entity_routes, resolve, AppState, EngineConfig, FieldDescriptor, FieldType, MemoryStore,
    ResourceDescriptor,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn descriptors() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new("User")
            .field(FieldDescriptor::new("name", FieldType::Text).required())
            .field(FieldDescriptor::new("email", FieldType::Email).required().unique()),
        ResourceDescriptor::new("Tag").field(FieldDescriptor::new("label", FieldType::Text).required()),
        ResourceDescriptor::new("Task")
            .field(FieldDescriptor::new("title", FieldType::Text).required())
            .field(FieldDescriptor::new("done", FieldType::Boolean).required())
            .field(FieldDescriptor::enumeration("priority", ["low", "medium", "high"]))
            .field(FieldDescriptor::relation("owner", "User")),
    ]
}

pub fn state_with(config: EngineConfig) -> AppState {
    let model = resolve(&descriptors()).expect("descriptors resolve");
    AppState::new(Arc::new(MemoryStore::new()), model, config)
}

pub fn app() -> Router {
    entity_routes(state_with(EngineConfig::default()))
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw: Bytes,
}

impl Reply {
    pub fn json(&self) -> Value {
        if self.raw.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.raw).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.raw.to_vec()).expect("response body is UTF-8")
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let raw = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    Reply { status, headers, raw }
}

pub fn request(method: Method, uri: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    send(app, request(method, uri, body.as_ref())).await
}

/// POST and return `data` of the 201 response.
pub async fn create(app: &Router, collection: &str, body: Value) -> Value {
    let reply = call(app, Method::POST, &format!("/{}", collection), Some(body)).await;
    assert_eq!(reply.status, StatusCode::CREATED, "create failed: {}", reply.text());
    reply.json()["data"].clone()
}

pub fn id(record: &Value) -> String {
    record["id"].as_str().expect("record has id").to_string()
}
