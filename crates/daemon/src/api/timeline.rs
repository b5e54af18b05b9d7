use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use engine::compiler::{assemble_storyboard, StoryboardEntry};
use engine::diff::TimelineDiff;
use engine::ops::TimelineOperation;
use engine::{Timeline, TimelineSettings};
use serde::{Deserialize, Serialize};

use crate::db::{EditLog, GenerationKind, TimelineEdit};
use crate::error::{AppError, AppResult};
use crate::providers::JobState;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ApplyOperationsRequest {
    operations: Vec<TimelineOperation>,
}

#[derive(Deserialize, Default)]
pub struct AssembleRequest {
    #[serde(default)]
    settings: Option<TimelineSettings>,
}

#[derive(Serialize)]
pub struct TimelineResponse {
    timeline: Timeline,
    diff: TimelineDiff,
}

#[derive(Serialize)]
pub struct AssembleResponse {
    timeline: Timeline,
    diff: TimelineDiff,
    /// Shots left out because they have no finished video yet.
    missing_shots: Vec<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/:id/timeline", get(get_timeline))
        .route("/projects/:id/timeline/apply", post(apply_operations))
        .route("/projects/:id/timeline/assemble", post(assemble))
        .route("/projects/:id/timeline/history", get(history))
}

/// Stored timeline, or an empty one for a project that has never been edited.
fn load_timeline(state: &AppState, project_id: i64) -> AppResult<Timeline> {
    Ok(state.db.get_timeline(project_id)?.unwrap_or_default())
}

/// A clip may only point at a finished video of the same project.
fn check_clip_source(state: &AppState, project_id: i64, generation_id: i64) -> AppResult<()> {
    let generation = state
        .db
        .get_generation(generation_id)?
        .filter(|g| g.project_id == project_id)
        .ok_or_else(|| AppError::not_found("Generation", generation_id))?;

    if generation.kind != GenerationKind::Video
        || generation.status != JobState::Succeeded
        || generation.asset_url.is_none()
    {
        return Err(AppError::BadRequest(format!(
            "generation {} is not a finished video",
            generation_id
        )));
    }
    Ok(())
}

async fn get_timeline(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> AppResult<Json<Timeline>> {
    state.project(project_id)?;
    Ok(Json(load_timeline(&state, project_id)?))
}

/// Apply a batch of edits. The batch is all-or-nothing: a failing operation
/// leaves the stored timeline untouched.
async fn apply_operations(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(req): Json<ApplyOperationsRequest>,
) -> AppResult<Json<TimelineResponse>> {
    state.project(project_id)?;
    for op in &req.operations {
        if let TimelineOperation::InsertClip { generation_id, .. } = op {
            check_clip_source(&state, project_id, *generation_id)?;
        }
    }

    let count = req.operations.len();
    let TimelineEdit { timeline, diff } =
        state.db.edit_timeline(project_id, |timeline| -> AppResult<()> {
            timeline.apply_all(req.operations)?;
            Ok(())
        })?;

    tracing::info!(project_id, operations = count, clips = timeline.clip_count(), "Timeline edited");
    Ok(Json(TimelineResponse { timeline, diff }))
}

/// Rebuild the rough cut from the latest finished video of every shot, in
/// screenplay order.
async fn assemble(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    body: Option<Json<AssembleRequest>>,
) -> AppResult<Json<AssembleResponse>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    state.project(project_id)?;

    let shots = state.db.get_shots_for_project(project_id)?;
    let videos = state.db.latest_videos_for_project(project_id)?;

    let mut entries = Vec::new();
    let mut missing_shots = Vec::new();
    for shot in &shots {
        match videos.get(&shot.id) {
            Some(video) => entries.push(StoryboardEntry {
                shot_id: shot.id,
                generation_id: video.id,
                label: shot.description.clone(),
                planned_duration_secs: shot.duration_secs,
                generated_duration_secs: video.duration_secs,
            }),
            None => missing_shots.push(shot.id),
        }
    }

    let TimelineEdit { timeline, diff } =
        state.db.edit_timeline(project_id, |timeline| -> AppResult<()> {
            let settings = req.settings.unwrap_or_else(|| timeline.settings.clone());
            *timeline = assemble_storyboard(&entries, settings);
            Ok(())
        })?;

    tracing::info!(
        project_id,
        clips = entries.len(),
        missing = missing_shots.len(),
        "Storyboard assembled"
    );
    Ok(Json(AssembleResponse {
        timeline,
        diff,
        missing_shots,
    }))
}

async fn history(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> AppResult<Json<Vec<EditLog>>> {
    state.project(project_id)?;
    Ok(Json(state.db.get_edit_logs(project_id)?))
}
