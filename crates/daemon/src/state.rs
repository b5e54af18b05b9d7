use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::providers::Providers;

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub providers: Arc<Providers>,
}

impl AppState {
    pub fn new(db: Database, config: Config, providers: Providers) -> Self {
        AppState {
            db: Arc::new(db),
            config: Arc::new(config),
            providers: Arc::new(providers),
        }
    }

    /// Load a project or fail with 404; most routes are project-scoped.
    pub fn project(&self, id: i64) -> AppResult<crate::db::Project> {
        self.db
            .get_project(id)?
            .ok_or_else(|| AppError::not_found("Project", id))
    }

    pub fn shot(&self, id: i64) -> AppResult<crate::db::Shot> {
        self.db
            .get_shot(id)?
            .ok_or_else(|| AppError::not_found("Shot", id))
    }
}
