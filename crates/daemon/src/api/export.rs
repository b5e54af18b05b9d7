use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use engine::edl::to_edl;
use engine::render::{generate_render_command, ExportPreset};
use engine::Timeline;
use serde::Deserialize;
use std::collections::HashMap;

use crate::db::{Export, ExportFormat, ExportStatus};
use crate::error::{AppError, AppResult};
use crate::media::ffmpeg::FFmpegWrapper;
use crate::media::{compute_file_checksum, export_path, write_text_export};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExportRequest {
    format: ExportFormat,
    #[serde(default)]
    preset: ExportPreset,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/:id/export", post(export))
        .route("/exports/:id", get(get_export))
}

fn load_export(state: &AppState, id: i64) -> AppResult<Export> {
    state
        .db
        .get_export(id)?
        .ok_or_else(|| AppError::not_found("Export", id))
}

/// generation_id -> asset URL for every clip whose generation belongs to the
/// project and has one.
fn clip_sources(
    state: &AppState,
    project_id: i64,
    timeline: &Timeline,
) -> AppResult<HashMap<i64, String>> {
    let mut sources = HashMap::new();
    for track in &timeline.tracks {
        for clip in &track.clips {
            if sources.contains_key(&clip.generation_id) {
                continue;
            }
            if let Some(url) = state
                .db
                .get_generation(clip.generation_id)?
                .filter(|g| g.project_id == project_id)
                .and_then(|g| g.asset_url)
            {
                sources.insert(clip.generation_id, url);
            }
        }
    }
    Ok(sources)
}

async fn export(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(req): Json<ExportRequest>,
) -> AppResult<Response> {
    let project = state.project(project_id)?;
    let timeline = state.db.get_timeline(project_id)?.unwrap_or_default();

    match req.format {
        ExportFormat::Edl => {
            let edl = to_edl(&project.bible.title, &timeline, timeline.settings.fps);
            let export_id = finish_text_export(&state, project_id, req.format, req.preset, "edl", &edl).await?;

            let mut response = (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                edl,
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&export_id.to_string()) {
                response.headers_mut().insert("x-export-id", value);
            }
            Ok(response)
        }
        ExportFormat::Bible => {
            let json = serde_json::to_string_pretty(&project.bible)
                .map_err(|e| AppError::Internal(e.into()))?;
            let export_id = finish_text_export(&state, project_id, req.format, req.preset, "json", &json).await?;
            Ok((StatusCode::CREATED, Json(load_export(&state, export_id)?)).into_response())
        }
        ExportFormat::Mp4 => {
            let export = start_render(&state, project_id, req.preset, &timeline)?;
            Ok((StatusCode::ACCEPTED, Json(export)).into_response())
        }
    }
}

async fn finish_text_export(
    state: &AppState,
    project_id: i64,
    format: ExportFormat,
    preset: ExportPreset,
    extension: &str,
    contents: &str,
) -> AppResult<i64> {
    let export_id = state
        .db
        .create_export(project_id, format, preset, ExportStatus::Rendering)?;
    let path = export_path(&state.config.export_dir, project_id, export_id, extension);

    match write_text_export(&path, contents).await {
        Ok(checksum) => {
            state.db.set_export_path(export_id, &path.to_string_lossy())?;
            state
                .db
                .update_export(export_id, ExportStatus::Completed, Some(&checksum), None)?;
            tracing::info!(project_id, export_id, format = format.as_str(), "Export written");
            Ok(export_id)
        }
        Err(e) => {
            state
                .db
                .update_export(export_id, ExportStatus::Failed, None, Some(&e.to_string()))?;
            Err(AppError::Internal(e))
        }
    }
}

/// Record the export and render it in the background; callers poll
/// `GET /exports/:id` for the outcome.
fn start_render(
    state: &AppState,
    project_id: i64,
    preset: ExportPreset,
    timeline: &Timeline,
) -> AppResult<Export> {
    let sources = clip_sources(state, project_id, timeline)?;
    let export_id = state
        .db
        .create_export(project_id, ExportFormat::Mp4, preset, ExportStatus::Rendering)?;
    let output_path = export_path(&state.config.export_dir, project_id, export_id, "mp4");
    state.db.set_export_path(export_id, &output_path.to_string_lossy())?;

    let command = generate_render_command(timeline, preset, &sources, output_path);
    if !command.skipped_clips.is_empty() {
        tracing::warn!(
            export_id,
            skipped = command.skipped_clips.len(),
            "Clips without a finished asset left out of the render"
        );
    }

    let db = state.db.clone();
    tokio::spawn(async move {
        let outcome = match FFmpegWrapper::render(&command).await {
            Ok(()) => compute_file_checksum(&command.output_path).await,
            Err(e) => Err(e),
        };
        let update = match outcome {
            Ok(checksum) => {
                tracing::info!(export_id, "Render completed");
                db.update_export(export_id, ExportStatus::Completed, Some(&checksum), None)
            }
            Err(e) => {
                tracing::error!(export_id, error = %e, "Render failed");
                db.update_export(export_id, ExportStatus::Failed, None, Some(&e.to_string()))
            }
        };
        if let Err(e) = update {
            tracing::error!(export_id, error = %e, "Failed to record render outcome");
        }
    });

    load_export(state, export_id)
}

async fn get_export(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Export>> {
    Ok(Json(load_export(&state, id)?))
}
