//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for querying the assistant and inspecting the
//! catalog.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Pensum API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    /// The question to ask.
    query: String,
    /// Session ID for conversational context; a new session is created when
    /// absent.
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<SourceInfo>,
    session_id: String,
}

#[derive(Serialize)]
struct SourceInfo {
    label: String,
    course_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lesson_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lesson_link: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| state.orchestrator.sessions().create_session());

    match state.orchestrator.query(&req.query, Some(&session_id)).await {
        Ok(outcome) => Json(QueryResponse {
            answer: outcome.answer,
            sources: outcome
                .sources
                .into_iter()
                .map(|s| SourceInfo {
                    label: s.label,
                    course_title: s.course_title,
                    lesson_number: s.lesson_number,
                    lesson_link: s.lesson_link,
                })
                .collect(),
            session_id,
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.orchestrator.analytics().await {
        Ok(analytics) => Json(analytics).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
