#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Clip not found: {0}")]
    ClipNotFound(String),

    #[error("Marker not found: {0}")]
    MarkerNotFound(String),

    #[error("Cannot split clip {clip_id} at {position_ticks}")]
    InvalidSplit { clip_id: String, position_ticks: i64 },

    #[error("Invalid script: {0}")]
    InvalidScript(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
