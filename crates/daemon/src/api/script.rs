use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use engine::bible::{ProjectBible, Script};
use engine::pricing::{estimate_cost_cents, Provider, UsageKind};
use serde::Serialize;

use super::scenes::{load_breakdown, SceneWithShots};
use crate::db::{NewLedgerEntry, Project};
use crate::error::{AppError, AppResult};
use crate::providers::ScriptRequest;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ScriptResponse {
    project: Project,
    scenes: Vec<SceneWithShots>,
    total_tokens: u64,
    cost_cents: i64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/projects/:id/script", post(generate_script).put(put_script))
}

/// Fold the request's creative brief into the bible alongside the new script.
fn merge_brief(bible: &mut ProjectBible, request: &ScriptRequest, script: Script) {
    if !request.title.trim().is_empty() {
        bible.title = request.title.trim().to_string();
    }
    bible.logline = request.logline.trim().to_string();
    if request.genre.is_some() {
        bible.genre = request.genre.clone();
    }
    if let Some(style) = &request.visual_style {
        bible.visual_style = style.clone();
    }
    bible.script = script;
}

async fn generate_script(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(req): Json<ScriptRequest>,
) -> AppResult<Json<ScriptResponse>> {
    let project = state.project(project_id)?;
    if req.logline.trim().is_empty() {
        return Err(AppError::BadRequest("logline must not be empty".into()));
    }
    let writer = state.providers.script()?;

    let draft = writer.write_script(&req).await?;
    let shot_count = draft.script.shot_count();

    let mut bible = project.bible;
    merge_brief(&mut bible, &req, draft.script);
    state.db.replace_script_and_bible(project_id, &bible)?;

    let cost_cents = estimate_cost_cents(
        Provider::OpenAi,
        UsageKind::ScriptTokens,
        draft.total_tokens as f64,
    );
    state.db.record_usage(&NewLedgerEntry {
        project_id,
        generation_id: None,
        provider: Provider::OpenAi,
        kind: UsageKind::ScriptTokens,
        units: draft.total_tokens as f64,
        cost_cents,
        note: Some(writer.model()),
    })?;

    tracing::info!(
        project_id,
        shots = shot_count,
        tokens = draft.total_tokens,
        "Script generated"
    );

    Ok(Json(ScriptResponse {
        project: state.project(project_id)?,
        scenes: load_breakdown(&state, project_id)?,
        total_tokens: draft.total_tokens,
        cost_cents,
    }))
}

/// Replace the script by hand, bypassing the writer.
async fn put_script(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(script): Json<Script>,
) -> AppResult<Json<ScriptResponse>> {
    let mut bible = state.project(project_id)?.bible;
    script.validate()?;

    bible.script = script;
    state.db.replace_script_and_bible(project_id, &bible)?;

    Ok(Json(ScriptResponse {
        project: state.project(project_id)?,
        scenes: load_breakdown(&state, project_id)?,
        total_tokens: 0,
        cost_cents: 0,
    }))
}
