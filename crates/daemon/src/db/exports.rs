use super::{invalid_column, now, parse_timestamp, Database};
use anyhow::Result;
use chrono::{DateTime, Utc};
use engine::render::ExportPreset;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Mp4,
    Edl,
    Bible,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Edl => "edl",
            ExportFormat::Bible => "bible",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(ExportFormat::Mp4),
            "edl" => Ok(ExportFormat::Edl),
            "bible" => Ok(ExportFormat::Bible),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Rendering,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Rendering => "rendering",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
        }
    }
}

impl FromStr for ExportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rendering" => Ok(ExportStatus::Rendering),
            "completed" => Ok(ExportStatus::Completed),
            "failed" => Ok(ExportStatus::Failed),
            other => Err(format!("unknown export status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Export {
    pub id: i64,
    pub project_id: i64,
    pub format: ExportFormat,
    pub preset: ExportPreset,
    pub out_path: Option<String>,
    pub status: ExportStatus,
    pub checksum: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Export {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let format: String = row.get(2)?;
        let preset: String = row.get(3)?;
        let status: String = row.get(5)?;
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;
        Ok(Export {
            id: row.get(0)?,
            project_id: row.get(1)?,
            format: format.parse().map_err(|_| invalid_column(2))?,
            preset: preset.parse().map_err(|_| invalid_column(3))?,
            out_path: row.get(4)?,
            status: status.parse().map_err(|_| invalid_column(5))?,
            checksum: row.get(6)?,
            error: row.get(7)?,
            created_at: parse_timestamp(&created_at, 8)?,
            updated_at: parse_timestamp(&updated_at, 9)?,
        })
    }
}

impl Database {
    pub fn create_export(
        &self,
        project_id: i64,
        format: ExportFormat,
        preset: ExportPreset,
        status: ExportStatus,
    ) -> Result<i64> {
        let now = now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO exports (project_id, format, preset, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![project_id, format.as_str(), preset.as_str(), status.as_str(), now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Output files are named after the export id, so the path is set once
    /// the row exists.
    pub fn set_export_path(&self, id: i64, out_path: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE exports SET out_path = ?1 WHERE id = ?2",
            params![out_path, id],
        )?;
        Ok(())
    }

    pub fn get_export(&self, id: i64) -> Result<Option<Export>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, format, preset, out_path, status, checksum, error, created_at, updated_at
             FROM exports WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], |row| Export::from_row(row))?;

        match rows.next() {
            Some(Ok(export)) => Ok(Some(export)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn update_export(
        &self,
        id: i64,
        status: ExportStatus,
        checksum: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE exports SET status = ?1, checksum = ?2, error = ?3, updated_at = ?4 WHERE id = ?5",
            params![status.as_str(), checksum, error, now(), id],
        )?;
        Ok(())
    }
}
