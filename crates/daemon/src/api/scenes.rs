use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;

use crate::db::{NewScene, NewShot, Scene, SceneUpdate, Shot, ShotUpdate};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SceneWithShots {
    #[serde(flatten)]
    pub scene: Scene,
    pub shots: Vec<Shot>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/:id/scenes", get(list_scenes).post(create_scene))
        .route("/scenes/:id", patch(update_scene).delete(delete_scene))
        .route("/scenes/:id/shots", post(create_shot))
        .route("/shots/:id", get(get_shot).patch(update_shot).delete(delete_shot))
}

/// The project's breakdown: scenes in order, each with its shots.
pub(crate) fn load_breakdown(state: &AppState, project_id: i64) -> AppResult<Vec<SceneWithShots>> {
    let scenes = state.db.get_scenes_for_project(project_id)?;
    let mut breakdown = Vec::with_capacity(scenes.len());
    for scene in scenes {
        let shots = state.db.get_shots_for_scene(scene.id)?;
        breakdown.push(SceneWithShots { scene, shots });
    }
    Ok(breakdown)
}

fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_duration(duration_secs: f64) -> AppResult<()> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(AppError::BadRequest(format!(
            "duration_secs must be positive, got {}",
            duration_secs
        )));
    }
    Ok(())
}

async fn list_scenes(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> AppResult<Json<Vec<SceneWithShots>>> {
    state.project(project_id)?;
    Ok(Json(load_breakdown(&state, project_id)?))
}

async fn create_scene(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(req): Json<NewScene>,
) -> AppResult<(StatusCode, Json<Scene>)> {
    state.project(project_id)?;
    require_text(&req.heading, "heading")?;

    let id = state.db.create_scene(project_id, &req)?;
    let scene = state
        .db
        .get_scene(id)?
        .ok_or_else(|| AppError::not_found("Scene", id))?;
    Ok((StatusCode::CREATED, Json(scene)))
}

async fn update_scene(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SceneUpdate>,
) -> AppResult<Json<Scene>> {
    if let Some(heading) = &req.heading {
        require_text(heading, "heading")?;
    }
    if !state.db.update_scene(id, &req)? {
        return Err(AppError::not_found("Scene", id));
    }
    let scene = state
        .db
        .get_scene(id)?
        .ok_or_else(|| AppError::not_found("Scene", id))?;
    Ok(Json(scene))
}

async fn delete_scene(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    if !state.db.delete_scene(id)? {
        return Err(AppError::not_found("Scene", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn create_shot(
    State(state): State<AppState>,
    Path(scene_id): Path<i64>,
    Json(req): Json<NewShot>,
) -> AppResult<(StatusCode, Json<Shot>)> {
    require_text(&req.description, "description")?;
    require_duration(req.duration_secs)?;

    let id = state
        .db
        .create_shot(scene_id, &req)?
        .ok_or_else(|| AppError::not_found("Scene", scene_id))?;
    Ok((StatusCode::CREATED, Json(state.shot(id)?)))
}

async fn get_shot(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Shot>> {
    Ok(Json(state.shot(id)?))
}

async fn update_shot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ShotUpdate>,
) -> AppResult<Json<Shot>> {
    if let Some(description) = &req.description {
        require_text(description, "description")?;
    }
    if let Some(duration_secs) = req.duration_secs {
        require_duration(duration_secs)?;
    }
    if !state.db.update_shot(id, &req)? {
        return Err(AppError::not_found("Shot", id));
    }
    Ok(Json(state.shot(id)?))
}

async fn delete_shot(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    if !state.db.delete_shot(id)? {
        return Err(AppError::not_found("Shot", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
