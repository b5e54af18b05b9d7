use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use engine::pricing::UsageSummary;
use serde::Serialize;

use crate::db::LedgerEntry;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UsageResponse {
    entries: Vec<LedgerEntry>,
    summary: UsageSummary,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/projects/:id/usage", get(get_usage))
}

async fn get_usage(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> AppResult<Json<UsageResponse>> {
    state.project(project_id)?;
    Ok(Json(UsageResponse {
        entries: state.db.get_usage_for_project(project_id)?,
        summary: state.db.usage_summary(project_id)?,
    }))
}
