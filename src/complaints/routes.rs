//! REST endpoints for complaint intake and queries.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, Query, State, rejection::JsonRejection},
    http::{Extensions, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use super::intake::IntakeService;
use super::query::QueryService;
use crate::error::ComplaintError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeService>,
    pub query: Arc<QueryService>,
}

/// Build the Axum router with the complaint routes, CORS, and request tracing.
pub fn complaint_routes(intake: Arc<IntakeService>, query: Arc<QueryService>) -> Router {
    let state = AppState { intake, query };

    Router::new()
        .route("/health", get(health))
        .route("/complaints", get(list_complaints).post(submit_complaint))
        .route("/complaints/{id}", get(get_complaint))
        .route("/complaints/{id}/status", patch(update_status))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// ── Errors ──────────────────────────────────────────────────────────────

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for ComplaintError {
    fn into_response(self) -> Response {
        match &self {
            ComplaintError::InvalidInput(msg) => error_body(StatusCode::BAD_REQUEST, msg.clone()),
            ComplaintError::NotFound { .. } => error_body(StatusCode::NOT_FOUND, self.to_string()),
            ComplaintError::InvalidTransition { .. } => {
                error_body(StatusCode::CONFLICT, self.to_string())
            }
            ComplaintError::Storage(e) => {
                error!(error = %e, "Storage failure");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn parse_id(raw: &str) -> Result<i64, Response> {
    raw.parse()
        .map_err(|_| error_body(StatusCode::BAD_REQUEST, "Invalid complaint ID"))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "complaint-desk"
    }))
}

// ── Intake ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    text: Option<String>,
}

/// Origin for geolocation: first `X-Forwarded-For` hop, else the peer.
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    match forwarded {
        Some(ip) => Some(ip.to_string()),
        None => extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
    }
}

async fn submit_complaint(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected complaint body");
            return error_body(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };
    let Some(text) = body.text else {
        return error_body(StatusCode::BAD_REQUEST, "Field 'text' is required");
    };

    let origin = client_ip(&headers, &extensions);
    match state.intake.submit_from(&text, origin.as_deref()).await {
        Ok(complaint) => (StatusCode::CREATED, Json(complaint)).into_response(),
        Err(e) => e.into_response(),
    }
}

// ── Queries ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListParams {
    status: Option<String>,
    since: Option<String>,
}

async fn list_complaints(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    match state
        .query
        .list(params.status.as_deref(), params.since.as_deref())
        .await
    {
        Ok(complaints) => Json(complaints).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_complaint(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.query.get(id).await {
        Ok(complaint) => Json(complaint).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Deserialize)]
struct StatusParams {
    new_status: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<StatusParams>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Some(new_status) = params.new_status else {
        return error_body(StatusCode::BAD_REQUEST, "Query parameter 'new_status' is required");
    };

    match state.query.update_status(id, &new_status).await {
        Ok(complaint) => Json(complaint).into_response(),
        Err(e) => e.into_response(),
    }
}
