//! HTTP front for the handler: `ANY /api` builds a gateway event from the request,
//! `POST /invoke` takes a raw gateway event document.

use crate::error::AppError;
use crate::event::{GatewayEvent, GatewayResponse};
use crate::handler::handle;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, post},
    Json, Router,
};
use std::collections::HashMap;
use tower_http::limit::RequestBodyLimitLayer;

async fn api(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let event = GatewayEvent {
        http_method: Some(method.as_str().to_string()),
        query_string_parameters: Some(params),
        body: (!body.is_empty()).then_some(body),
    };
    into_http(handle(state.db.as_ref(), &event).await)
}

async fn invoke(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<GatewayResponse>, AppError> {
    let event: GatewayEvent = serde_json::from_str(&body)?;
    Ok(Json(handle(state.db.as_ref(), &event).await))
}

/// Replay a gateway response as a plain HTTP response, headers verbatim.
fn into_http(resp: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = (status, resp.body).into_response();
    let headers = out.headers_mut();
    headers.remove(CONTENT_TYPE);
    for (name, value) in &resp.headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid response header"),
        }
    }
    out
}

pub fn gateway_routes(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/api", any(api))
        .route("/invoke", post(invoke))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .with_state(state)
}
