use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use engine::pricing::{estimate_cost_cents, Provider, UsageKind};
use serde::Deserialize;

use super::character::{lock_prompt, shot_base_prompt};
use crate::db::{Generation, GenerationKind, NewGeneration, NewLedgerEntry};
use crate::error::{AppError, AppResult};
use crate::providers::{ImageRequest, ProviderJob, VideoRequest};
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct StoryboardRequest {
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Deserialize)]
pub struct VideoGenerateRequest {
    #[serde(default = "default_video_provider")]
    provider: Provider,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    duration_secs: Option<f64>,
}

fn default_video_provider() -> Provider {
    Provider::Sora
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shots/:id/storyboard", post(generate_storyboard))
        .route("/shots/:id/video", post(generate_video))
}

struct Submission<'a> {
    project_id: i64,
    shot_id: i64,
    kind: GenerationKind,
    provider: Provider,
    model: &'a str,
    prompt: &'a str,
    duration_secs: Option<f64>,
    usage_kind: UsageKind,
    units: f64,
}

/// Persist a submitted job and bill its estimated cost to the ledger.
fn record_submission(state: &AppState, submission: Submission, job: &ProviderJob) -> AppResult<Generation> {
    let cost_cents = estimate_cost_cents(submission.provider, submission.usage_kind, submission.units);
    let generation_id = state.db.create_generation(&NewGeneration {
        project_id: submission.project_id,
        shot_id: Some(submission.shot_id),
        kind: submission.kind,
        provider: submission.provider,
        model: submission.model,
        prompt: submission.prompt,
        duration_secs: submission.duration_secs,
        cost_cents,
        job,
    })?;
    state.db.record_usage(&NewLedgerEntry {
        project_id: submission.project_id,
        generation_id: Some(generation_id),
        provider: submission.provider,
        kind: submission.usage_kind,
        units: submission.units,
        cost_cents,
        note: Some(submission.model),
    })?;

    tracing::info!(
        generation_id,
        shot_id = submission.shot_id,
        provider = %submission.provider,
        status = job.status.as_str(),
        cost_cents,
        "Generation submitted"
    );

    state
        .db
        .get_generation(generation_id)?
        .ok_or_else(|| AppError::not_found("Generation", generation_id))
}

async fn generate_storyboard(
    State(state): State<AppState>,
    Path(shot_id): Path<i64>,
    body: Option<Json<StoryboardRequest>>,
) -> AppResult<(StatusCode, Json<Generation>)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let shot = state.shot(shot_id)?;
    let project = state.project(shot.project_id)?;
    let images = state.providers.images()?;

    let base = shot_base_prompt(&state, &project, &shot, req.prompt.as_deref())?;
    let locked = lock_prompt(&state, project.id, &base)?;

    let job = images
        .generate_image(&ImageRequest {
            prompt: locked.prompt.clone(),
            aspect_ratio: project.bible.visual_style.aspect_ratio.clone(),
            reference_images: locked.reference_images,
        })
        .await?;

    let generation = record_submission(
        &state,
        Submission {
            project_id: project.id,
            shot_id,
            kind: GenerationKind::Image,
            provider: Provider::Replicate,
            model: images.model(),
            prompt: &locked.prompt,
            duration_secs: None,
            usage_kind: UsageKind::ImageGeneration,
            units: 1.0,
        },
        &job,
    )?;
    Ok((StatusCode::CREATED, Json(generation)))
}

async fn generate_video(
    State(state): State<AppState>,
    Path(shot_id): Path<i64>,
    Json(req): Json<VideoGenerateRequest>,
) -> AppResult<(StatusCode, Json<Generation>)> {
    let shot = state.shot(shot_id)?;
    let project = state.project(shot.project_id)?;
    let client = state.providers.video(req.provider)?;

    let requested = req.duration_secs.unwrap_or(shot.duration_secs);
    if !requested.is_finite() || requested <= 0.0 {
        return Err(AppError::BadRequest(format!(
            "duration_secs must be positive, got {}",
            requested
        )));
    }
    let duration_secs = client.clip_seconds(requested);

    let base = shot_base_prompt(&state, &project, &shot, req.prompt.as_deref())?;
    let locked = lock_prompt(&state, project.id, &base)?;

    let job = client
        .submit_video(&VideoRequest {
            prompt: locked.prompt.clone(),
            duration_secs,
            aspect_ratio: project.bible.visual_style.aspect_ratio.clone(),
        })
        .await?;

    let generation = record_submission(
        &state,
        Submission {
            project_id: project.id,
            shot_id,
            kind: GenerationKind::Video,
            provider: client.provider(),
            model: client.model(),
            prompt: &locked.prompt,
            duration_secs: Some(duration_secs),
            usage_kind: UsageKind::VideoSeconds,
            units: duration_secs,
        },
        &job,
    )?;
    Ok((StatusCode::CREATED, Json(generation)))
}
