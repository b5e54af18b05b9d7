use axum::Router;

use crate::state::AppState;

pub mod character;
pub mod export;
pub mod generate;
pub mod generations;
pub mod projects;
pub mod scenes;
pub mod script;
pub mod timeline;
pub mod usage;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(projects::router())
        .merge(scenes::router())
        .merge(script::router())
        .merge(character::router())
        .merge(generate::router())
        .merge(generations::router())
        .merge(timeline::router())
        .merge(export::router())
        .merge(usage::router())
        .with_state(state)
}
