//! HTTP route handlers for the artifact API.

use std::fs;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use builder::io::artifact::{ArtifactEntry, read_artifacts};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{level}/{tag}/{name}", get(get_task))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct TasksResponse {
    tasks: Vec<ArtifactEntry>,
}

/// GET /api/tasks - every artifact, sorted by path.
async fn list_tasks(State(state): State<AppState>) -> Result<Json<TasksResponse>, StatusCode> {
    if !state.release_dir.exists() {
        return Ok(Json(TasksResponse { tasks: vec![] }));
    }
    let tasks = read_artifacts(&state.release_dir).map_err(|err| {
        warn!(err = %format!("{err:#}"), "failed to read artifacts");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(TasksResponse { tasks }))
}

/// GET /api/tasks/{level}/{tag}/{name} - one artifact.
async fn get_task(
    State(state): State<AppState>,
    Path((level, tag, name)): Path<(String, String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let path = state
        .artifact_path(&level, &tag, &name)
        .ok_or(StatusCode::BAD_REQUEST)?;
    let value = read_json_value(&path)?;
    Ok(Json(value))
}

fn read_json_value(path: &std::path::Path) -> Result<Value, StatusCode> {
    if !path.exists() {
        return Err(StatusCode::NOT_FOUND);
    }
    let contents = fs::read_to_string(path).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let value: Value =
        serde_json::from_str(&contents).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(value)
}
