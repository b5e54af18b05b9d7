use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use engine::bible::shot_prompt;
use engine::character_lock::{build_locked_prompt, reference_images, validate_palette, CharacterLockConfig};
use serde::{Deserialize, Serialize};

use crate::db::{Project, Shot};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    shot_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LockedPrompt {
    pub prompt: String,
    pub reference_images: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/:id/character-lock",
            get(get_character_lock).put(put_character_lock),
        )
        .route("/projects/:id/character-lock/preview", post(preview))
}

/// Apply the project's character lock (if any) to a base prompt.
pub(crate) fn lock_prompt(state: &AppState, project_id: i64, base: &str) -> AppResult<LockedPrompt> {
    match state.db.get_character_lock(project_id)? {
        Some(config) => Ok(LockedPrompt {
            prompt: build_locked_prompt(base, &config),
            reference_images: reference_images(&config)
                .into_iter()
                .map(String::from)
                .collect(),
        }),
        None => Ok(LockedPrompt {
            prompt: base.to_string(),
            reference_images: Vec::new(),
        }),
    }
}

/// Base prompt for a shot: an explicit override, else the shot described in
/// the project's visual style.
pub(crate) fn shot_base_prompt(
    state: &AppState,
    project: &Project,
    shot: &Shot,
    override_prompt: Option<&str>,
) -> AppResult<String> {
    if let Some(prompt) = override_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(prompt.to_string());
    }
    let heading = state
        .db
        .get_scene(shot.scene_id)?
        .map(|scene| scene.heading)
        .unwrap_or_default();
    Ok(shot_prompt(
        &project.bible.visual_style,
        &heading,
        &shot.description,
        &shot.camera,
    ))
}

fn validate_config(config: &CharacterLockConfig) -> AppResult<()> {
    if config.enabled && config.character.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "an enabled character lock needs a character name".into(),
        ));
    }
    validate_palette(&config.brand_palette)?;
    Ok(())
}

async fn get_character_lock(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> AppResult<Json<Option<CharacterLockConfig>>> {
    state.project(project_id)?;
    Ok(Json(state.db.get_character_lock(project_id)?))
}

async fn put_character_lock(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(config): Json<CharacterLockConfig>,
) -> AppResult<Json<CharacterLockConfig>> {
    state.project(project_id)?;
    validate_config(&config)?;
    state.db.put_character_lock(project_id, &config)?;
    tracing::info!(project_id, enabled = config.enabled, "Character lock updated");
    Ok(Json(config))
}

async fn preview(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(req): Json<PreviewRequest>,
) -> AppResult<Json<LockedPrompt>> {
    let project = state.project(project_id)?;
    let base = match req.shot_id {
        Some(shot_id) => {
            let shot = state.shot(shot_id)?;
            if shot.project_id != project_id {
                return Err(AppError::not_found("Shot", shot_id));
            }
            shot_base_prompt(&state, &project, &shot, req.prompt.as_deref())?
        }
        None => match req.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(prompt) => prompt.to_string(),
            None => return Err(AppError::BadRequest("prompt or shot_id is required".into())),
        },
    };
    Ok(Json(lock_prompt(&state, project_id, &base)?))
}
