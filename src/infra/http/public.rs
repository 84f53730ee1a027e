use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::{counters::CounterService, error::HttpError};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub counters: Arc<CounterService>,
}

impl HttpState {
    pub fn new(counters: Arc<CounterService>) -> Self {
        Self { counters }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/counter/{counter_id}/increment", post(increment_counter))
        .route("/counter/{counter_id}", get(read_counter))
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn health() -> &'static str {
    "OK"
}

async fn increment_counter(
    State(state): State<HttpState>,
    Path(counter_id): Path<String>,
) -> Response {
    match state.counters.increment(&counter_id).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(err) => err.into_response(),
    }
}

async fn read_counter(State(state): State<HttpState>, Path(counter_id): Path<String>) -> Response {
    match state.counters.value(&counter_id).await {
        Ok(value) => (StatusCode::OK, value.to_string()).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn method_not_allowed(method: Method, uri: Uri) -> HttpError {
    HttpError::new(
        "infra::http::public::method_not_allowed",
        StatusCode::METHOD_NOT_ALLOWED,
        "Method not allowed",
        format!("{method} is not supported on {}", uri.path()),
    )
}
