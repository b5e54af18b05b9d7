use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::db::Generation;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GenerationFilter {
    shot_id: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/:id/generations", get(list_generations))
        .route("/generations/:id", get(get_generation))
        .route("/generations/:id/refresh", post(refresh_generation))
}

async fn list_generations(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(filter): Query<GenerationFilter>,
) -> AppResult<Json<Vec<Generation>>> {
    state.project(project_id)?;
    let generations = match filter.shot_id {
        Some(shot_id) => state
            .db
            .get_generations_for_shot(shot_id)?
            .into_iter()
            .filter(|g| g.project_id == project_id)
            .collect(),
        None => state.db.get_generations_for_project(project_id)?,
    };
    Ok(Json(generations))
}

fn load(state: &AppState, id: i64) -> AppResult<Generation> {
    state
        .db
        .get_generation(id)?
        .ok_or_else(|| AppError::not_found("Generation", id))
}

async fn get_generation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Generation>> {
    Ok(Json(load(&state, id)?))
}

/// Ask the provider for the job's current state. Finished generations are
/// returned as stored.
async fn refresh_generation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Generation>> {
    let generation = load(&state, id)?;
    if generation.is_finished() {
        return Ok(Json(generation));
    }
    let external_id = generation.external_id.as_deref().ok_or_else(|| {
        AppError::BadRequest(format!("generation {} has no provider job to poll", id))
    })?;

    let job = state.providers.poll(generation.provider, external_id).await?;
    state.db.update_generation_status(id, &job)?;
    tracing::debug!(generation_id = id, status = job.status.as_str(), "Generation refreshed");

    Ok(Json(load(&state, id)?))
}
