//! Request dispatch. Stage order: method override, CORS preflight, HEAD mapping, route
//! match (or a structured 404), body parsing, content negotiation, handler, encoding.

pub mod action;
pub mod bulk;
pub mod entity;
pub mod relation;

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::query::parse_query_string;
use crate::response::{apply_cors, negotiate, ResponseFormat};
use crate::routes::{find_route, param, segments_after_prefix, PathParams, RouteKind};
use crate::service::{not_found, CrudService};
use crate::state::AppState;
use crate::store::Store;
use axum::{
    body::{Body, Bytes, HttpBody},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

/// Transport-independent request. The axum fallback builds one per request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiRequest {
    /// `uri` may carry a query string.
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (uri.to_string(), None),
        };
        ApiRequest {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Invalid header values are dropped.
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(v) = HeaderValue::from_str(value) {
            self.headers.insert(name, v);
        }
        self
    }

    pub fn json(self, body: &Value) -> Self {
        let mut request = self.header(header::CONTENT_TYPE, "application/json");
        request.body = Bytes::from(body.to_string());
        request
    }

    fn header_str(&self, name: impl axum::http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// One matched request as handlers see it.
pub struct RequestContext<'a> {
    pub state: &'a AppState,
    pub resource: &'a ResolvedResource,
    pub params: PathParams,
    pub query: Vec<(String, String)>,
    pub headers: &'a HeaderMap,
    pub body: Option<Value>,
}

impl RequestContext<'_> {
    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    pub fn param(&self, name: &str) -> Result<&str, AppError> {
        param(&self.params, name).ok_or_else(|| AppError::BadRequest(format!("Missing path parameter '{}'", name)))
    }

    pub fn id(&self) -> Result<&str, AppError> {
        self.param("id")
    }

    pub fn body_object(&self) -> Result<Map<String, Value>, AppError> {
        match &self.body {
            Some(Value::Object(map)) => Ok(map.clone()),
            _ => Err(AppError::BadRequest("Request body must be a JSON object".into())),
        }
    }

    pub fn header_str(&self, name: impl axum::http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Public path of one record, used for `Location`.
    pub fn record_path(&self, id: &str) -> String {
        format!("{}/{}/{}", self.state.config.prefix, self.resource.collection, id)
    }
}

/// Handler outcome before encoding. `body` is a full success envelope.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl Reply {
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        Reply {
            status,
            body,
            headers: HeaderMap::new(),
        }
    }

    pub fn ok(body: Value) -> Self {
        Reply::new(StatusCode::OK, Some(body))
    }

    pub fn created(body: Value) -> Self {
        Reply::new(StatusCode::CREATED, Some(body))
    }

    pub fn no_content() -> Self {
        Reply::new(StatusCode::NO_CONTENT, None)
    }

    /// Values that are not valid header text are skipped.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                self.headers.insert(name, v);
            }
            Err(_) => tracing::warn!(header = %name, "skipping unencodable response header"),
        }
        self
    }

    fn render(self, format: ResponseFormat) -> Response {
        let mut response = match &self.body {
            Some(body) => format.render(self.status, body),
            None => {
                let mut r = Response::new(Body::empty());
                *r.status_mut() = self.status;
                r
            }
        };
        response.headers_mut().extend(self.headers);
        response
    }
}

/// `X-HTTP-Method-Override` is honoured on POST only.
fn effective_method(request: &ApiRequest) -> Method {
    if request.method != Method::POST {
        return request.method.clone();
    }
    request
        .header_str(METHOD_OVERRIDE_HEADER)
        .and_then(|v| Method::from_bytes(v.trim().to_ascii_uppercase().as_bytes()).ok())
        .unwrap_or_else(|| request.method.clone())
}

fn is_json_content_type(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Empty bodies and GET bodies are ignored; anything else must be JSON.
fn parse_body(method: &Method, request: &ApiRequest) -> Result<Option<Value>, AppError> {
    if *method == Method::GET || request.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    if !is_json_content_type(request.header_str(header::CONTENT_TYPE)) {
        return Err(AppError::UnsupportedMediaType);
    }
    serde_json::from_slice(&request.body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("Malformed JSON body: {}", e)))
}

/// Distinguishes unknown resource, missing record and unknown action/relation.
async fn unmatched(state: &AppState, method: &Method, path: &str) -> AppError {
    let route_missing = || AppError::NotFound(format!("Route {} {} not found", method, path));
    let Some(segments) = segments_after_prefix(&state.config.prefix, path) else {
        return route_missing();
    };
    let Some((collection, rest)) = segments.split_first() else {
        return route_missing();
    };
    let Some(resource) = state.model.resource(collection) else {
        return AppError::NotFound(format!("Resource '{}' not found", collection));
    };
    if let [id, segment] = rest {
        match CrudService::find(state.store.as_ref(), resource, id).await {
            Err(e) => return e,
            Ok(None) => return not_found(resource, id),
            Ok(Some(_)) => {}
        }
        return if *method == Method::POST {
            AppError::NotFound(format!("Action '{}' not found", segment))
        } else {
            AppError::NotFound(format!("Relation '{}' not found", segment))
        };
    }
    route_missing()
}

async fn handle(state: &AppState, method: &Method, request: &ApiRequest) -> Result<Response, AppError> {
    let Some((route, params)) = find_route(&state.routes, method, &request.path) else {
        tracing::debug!(%method, path = %request.path, "no route matched");
        return Err(unmatched(state, method, &request.path).await);
    };
    tracing::debug!(%method, path = %request.path, route = %route.pattern, "dispatch");
    let resource = state
        .model
        .resource(&route.collection)
        .ok_or_else(|| AppError::NotFound(format!("Resource '{}' not found", route.collection)))?;
    let body = parse_body(method, request)?;
    let format = negotiate(request.header_str(header::ACCEPT))?;
    let ctx = RequestContext {
        state,
        resource,
        params,
        query: parse_query_string(request.query.as_deref()),
        headers: &request.headers,
        body,
    };

    let reply = match &route.kind {
        RouteKind::List => entity::list(&ctx).await,
        RouteKind::Create => entity::create(&ctx).await,
        RouteKind::Read => entity::read(&ctx).await,
        RouteKind::Update => entity::replace(&ctx).await,
        RouteKind::Patch => entity::patch(&ctx).await,
        RouteKind::Delete => entity::delete(&ctx).await,
        RouteKind::BulkCreate => bulk::create(&ctx).await,
        RouteKind::BulkUpdate => bulk::update(&ctx).await,
        RouteKind::BulkDelete => bulk::delete(&ctx).await,
        RouteKind::Complete => action::complete(&ctx).await,
        RouteKind::ChangePriority => action::change_priority(&ctx).await,
        RouteKind::CompleteAll => action::complete_all(&ctx).await,
        RouteKind::RelationGet { field } => relation::get_related(&ctx, field).await,
        RouteKind::RelationPut { field } => relation::set_related(&ctx, field).await,
        RouteKind::TagsList => relation::list_tags(&ctx).await,
        RouteKind::TagsAdd => relation::add_tag(&ctx).await,
        RouteKind::TagsRemove => relation::remove_tag(&ctx).await,
    }?;
    Ok(reply.render(format))
}

/// Run one request through the engine. Every response carries CORS headers; errors are
/// always JSON envelopes.
pub async fn dispatch(state: &AppState, request: ApiRequest) -> Response {
    let method = effective_method(&request);
    let mut response = if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let head = method == Method::HEAD;
        let routed = if head { Method::GET } else { method };
        let mut response = match handle(state, &routed, &request).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };
        if head {
            if let Some(len) = HttpBody::size_hint(response.body()).exact() {
                response.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(len));
            }
            *response.body_mut() = Body::empty();
        }
        response
    };
    apply_cors(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_splits_query() {
        let r = ApiRequest::new(Method::GET, "/tasks?page=2");
        assert_eq!(r.path, "/tasks");
        assert_eq!(r.query.as_deref(), Some("page=2"));
    }

    #[test]
    fn override_only_on_post() {
        let post = ApiRequest::new(Method::POST, "/tasks/1").header(
            HeaderName::from_static(METHOD_OVERRIDE_HEADER),
            "delete",
        );
        assert_eq!(effective_method(&post), Method::DELETE);
        let get = ApiRequest::new(Method::GET, "/tasks/1").header(
            HeaderName::from_static(METHOD_OVERRIDE_HEADER),
            "DELETE",
        );
        assert_eq!(effective_method(&get), Method::GET);
    }

    #[test]
    fn json_content_types() {
        assert!(is_json_content_type(Some("application/json; charset=utf-8")));
        assert!(is_json_content_type(Some("application/merge-patch+json")));
        assert!(!is_json_content_type(Some("text/plain")));
        assert!(!is_json_content_type(None));
    }

    #[tokio::test]
    async fn head_keeps_get_content_length() {
        use crate::config::{resolve, EngineConfig, FieldDescriptor, FieldType, ResourceDescriptor};
        use crate::store::MemoryStore;
        use std::sync::Arc;

        let model = resolve(&[
            ResourceDescriptor::new("Task").field(FieldDescriptor::new("title", FieldType::Text))
        ])
        .unwrap();
        let state = AppState::new(Arc::new(MemoryStore::new()), model, EngineConfig::default());
        let created = dispatch(
            &state,
            ApiRequest::new(Method::POST, "/tasks").json(&serde_json::json!({ "title": "A" })),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let location = created.headers()[header::LOCATION].to_str().unwrap().to_string();

        let get = dispatch(&state, ApiRequest::new(Method::GET, &location)).await;
        let body = axum::body::to_bytes(get.into_body(), usize::MAX).await.unwrap();
        let head = dispatch(&state, ApiRequest::new(Method::HEAD, &location)).await;
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(
            head.headers()[header::CONTENT_LENGTH].to_str().unwrap(),
            body.len().to_string()
        );
        let rest = axum::body::to_bytes(head.into_body(), usize::MAX).await.unwrap();
        assert!(rest.is_empty());
    }
}
