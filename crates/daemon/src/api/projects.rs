use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use engine::bible::ProjectBible;
use serde::Deserialize;

use crate::db::Project;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    name: String,
    #[serde(default)]
    bible: Option<ProjectBible>,
}

#[derive(Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bible: Option<ProjectBible>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id",
            get(get_project).patch(update_project).delete(delete_project),
        )
}

fn validate_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("project name must not be empty".into()));
    }
    Ok(name)
}

async fn list_projects(State(state): State<AppState>) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(state.db.get_all_projects()?))
}

async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let name = validate_name(&req.name)?;
    let mut bible = req.bible.unwrap_or_default();
    if bible.title.trim().is_empty() {
        bible.title = name.to_string();
    }

    let id = state.db.create_project(name, &bible)?;
    tracing::info!(project_id = id, "Project created");
    Ok((StatusCode::CREATED, Json(state.project(id)?)))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Project>> {
    Ok(Json(state.project(id)?))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProjectRequest>,
) -> AppResult<Json<Project>> {
    let name = req.name.as_deref().map(validate_name).transpose()?;
    // An empty script is a project that has not been broken down yet.
    if let Some(bible) = req.bible.as_ref().filter(|b| !b.script.scenes.is_empty()) {
        bible.script.validate()?;
    }
    if !state.db.update_project(id, name, req.bible.as_ref())? {
        return Err(AppError::not_found("Project", id));
    }
    Ok(Json(state.project(id)?))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !state.db.delete_project(id)? {
        return Err(AppError::not_found("Project", id));
    }
    tracing::info!(project_id = id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}
