use super::{invalid_column, now, parse_timestamp, Database};
use crate::providers::{JobState, ProviderJob};
use anyhow::Result;
use chrono::{DateTime, Utc};
use engine::pricing::Provider;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Image,
    Video,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Image => "image",
            GenerationKind::Video => "video",
        }
    }
}

impl FromStr for GenerationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(GenerationKind::Image),
            "video" => Ok(GenerationKind::Video),
            other => Err(format!("unknown generation kind: {}", other)),
        }
    }
}

/// An AI-produced asset and the provider job behind it.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub id: i64,
    pub project_id: i64,
    pub shot_id: Option<i64>,
    pub kind: GenerationKind,
    pub provider: Provider,
    pub model: String,
    pub prompt: String,
    pub status: JobState,
    pub external_id: Option<String>,
    pub asset_url: Option<String>,
    pub error: Option<String>,
    pub duration_secs: Option<f64>,
    pub cost_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn parse_column<T: FromStr>(row: &Row, column: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    raw.parse().map_err(|_| invalid_column(column))
}

impl Generation {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let created_at: String = row.get(13)?;
        let updated_at: String = row.get(14)?;
        Ok(Generation {
            id: row.get(0)?,
            project_id: row.get(1)?,
            shot_id: row.get(2)?,
            kind: parse_column(row, 3)?,
            provider: parse_column(row, 4)?,
            model: row.get(5)?,
            prompt: row.get(6)?,
            status: parse_column(row, 7)?,
            external_id: row.get(8)?,
            asset_url: row.get(9)?,
            error: row.get(10)?,
            duration_secs: row.get(11)?,
            cost_cents: row.get(12)?,
            created_at: parse_timestamp(&created_at, 13)?,
            updated_at: parse_timestamp(&updated_at, 14)?,
        })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobState::Succeeded | JobState::Failed)
    }
}

pub struct NewGeneration<'a> {
    pub project_id: i64,
    pub shot_id: Option<i64>,
    pub kind: GenerationKind,
    pub provider: Provider,
    pub model: &'a str,
    pub prompt: &'a str,
    pub duration_secs: Option<f64>,
    pub cost_cents: i64,
    pub job: &'a ProviderJob,
}

const GENERATION_COLUMNS: &str = "id, project_id, shot_id, kind, provider, model, prompt, status, \
     external_id, asset_url, error, duration_secs, cost_cents, created_at, updated_at";

impl Database {
    pub fn create_generation(&self, generation: &NewGeneration) -> Result<i64> {
        let now = now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO generations (project_id, shot_id, kind, provider, model, prompt, status,
                 external_id, asset_url, error, duration_secs, cost_cents, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                generation.project_id,
                generation.shot_id,
                generation.kind.as_str(),
                generation.provider.as_str(),
                generation.model,
                generation.prompt,
                generation.job.status.as_str(),
                generation.job.external_id,
                generation.job.asset_url,
                generation.job.error,
                generation.duration_secs,
                generation.cost_cents,
                now
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_generation(&self, id: i64) -> Result<Option<Generation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM generations WHERE id = ?1",
            GENERATION_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![id], |row| Generation::from_row(row))?;

        match rows.next() {
            Some(Ok(generation)) => Ok(Some(generation)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn get_generations_for_project(&self, project_id: i64) -> Result<Vec<Generation>> {
        self.query_generations("WHERE project_id = ?1 ORDER BY id DESC", project_id)
    }

    pub fn get_generations_for_shot(&self, shot_id: i64) -> Result<Vec<Generation>> {
        self.query_generations("WHERE shot_id = ?1 ORDER BY id DESC", shot_id)
    }

    fn query_generations(&self, clause: &str, key: i64) -> Result<Vec<Generation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM generations {}",
            GENERATION_COLUMNS, clause
        ))?;
        let rows = stmt.query_map(params![key], |row| Generation::from_row(row))?;

        let mut generations = Vec::new();
        for row in rows {
            generations.push(row?);
        }
        Ok(generations)
    }

    /// Record the latest provider view of a job. Fields the provider did not
    /// report keep their stored value.
    pub fn update_generation_status(&self, id: i64, job: &ProviderJob) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE generations SET status = ?1, asset_url = COALESCE(?2, asset_url),
                 error = COALESCE(?3, error), updated_at = ?4
             WHERE id = ?5",
            params![job.status.as_str(), job.asset_url, job.error, now(), id],
        )?;
        Ok(changed > 0)
    }

    /// Newest finished video per shot, keyed by shot id.
    pub fn latest_videos_for_project(&self, project_id: i64) -> Result<HashMap<i64, Generation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM generations
             WHERE project_id = ?1 AND kind = 'video' AND status = 'succeeded'
                 AND shot_id IS NOT NULL AND asset_url IS NOT NULL
             ORDER BY id",
            GENERATION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![project_id], |row| Generation::from_row(row))?;

        let mut latest = HashMap::new();
        for row in rows {
            let generation = row?;
            if let Some(shot_id) = generation.shot_id {
                latest.insert(shot_id, generation);
            }
        }
        Ok(latest)
    }
}
