//! Resource routes. The engine owns its route table and matcher, so axum only supplies a
//! fallback that hands every request to the dispatcher.

use crate::error::AppError;
use crate::handlers::{dispatch, ApiRequest};
use crate::response::apply_cors;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware::map_response_with_state,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

async fn engine(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(&state, rejection),
    };
    let request = ApiRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    };
    dispatch(&state, request).await
}

fn rejected(state: &AppState, rejection: BytesRejection) -> Response {
    let err = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(state.config.body_limit_bytes)
    } else {
        AppError::BadRequest(rejection.body_text())
    };
    tracing::debug!(error = %err, "request body rejected");
    let mut response = err.into_response();
    apply_cors(response.headers_mut());
    response
}

/// The limit layer answers oversized `Content-Length` requests itself with plain text.
/// Re-encode those as the engine's error envelope.
async fn envelope_oversized(State(limit): State<usize>, response: Response) -> Response {
    let plain = response.status() == StatusCode::PAYLOAD_TOO_LARGE
        && !response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN);
    if !plain {
        return response;
    }
    let mut response = AppError::PayloadTooLarge(limit).into_response();
    apply_cors(response.headers_mut());
    response
}

/// Mount the engine. Request bodies are capped at `config.body_limit_bytes`.
pub fn entity_routes(state: AppState) -> Router {
    let limit = state.config.body_limit_bytes;
    Router::new()
        .fallback(engine)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(map_response_with_state(limit, envelope_oversized))
        .with_state(state)
}
