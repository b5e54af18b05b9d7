use super::{invalid_column, now, parse_timestamp, Database};
use anyhow::Result;
use chrono::{DateTime, Utc};
use engine::bible::ProjectBible;
use engine::character_lock::CharacterLockConfig;
use rusqlite::{params, Row};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub bible: ProjectBible,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let bible_json: String = row.get(2)?;
        let bible = serde_json::from_str(&bible_json).map_err(|_| invalid_column(2))?;
        let created_at: String = row.get(3)?;
        let updated_at: String = row.get(4)?;

        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            bible,
            created_at: parse_timestamp(&created_at, 3)?,
            updated_at: parse_timestamp(&updated_at, 4)?,
        })
    }
}

const PROJECT_COLUMNS: &str = "id, name, bible_json, created_at, updated_at";

impl Database {
    pub fn create_project(&self, name: &str, bible: &ProjectBible) -> Result<i64> {
        let now = now();
        let bible_json = serde_json::to_string(bible)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO projects (name, bible_json, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![name, bible_json, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM projects WHERE id = ?1",
            PROJECT_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![id], |row| Project::from_row(row))?;

        match rows.next() {
            Some(Ok(project)) => Ok(Some(project)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM projects ORDER BY id DESC",
            PROJECT_COLUMNS
        ))?;
        let rows = stmt.query_map([], |row| Project::from_row(row))?;

        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    /// Returns false when the project does not exist.
    pub fn update_project(
        &self,
        id: i64,
        name: Option<&str>,
        bible: Option<&ProjectBible>,
    ) -> Result<bool> {
        let now = now();
        let conn = self.conn()?;
        let mut changed = conn.execute(
            "UPDATE projects SET updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        if let Some(name) = name {
            changed = conn.execute(
                "UPDATE projects SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
        }
        if let Some(bible) = bible {
            changed = conn.execute(
                "UPDATE projects SET bible_json = ?1 WHERE id = ?2",
                params![serde_json::to_string(bible)?, id],
            )?;
        }
        Ok(changed > 0)
    }

    pub fn delete_project(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    pub fn get_character_lock(&self, project_id: i64) -> Result<Option<CharacterLockConfig>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT config_json FROM character_locks WHERE project_id = ?1")?;
        let mut rows = stmt.query_map(params![project_id], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(Ok(json)) => Ok(Some(serde_json::from_str(&json)?)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn put_character_lock(&self, project_id: i64, config: &CharacterLockConfig) -> Result<()> {
        let now = now();
        let config_json = serde_json::to_string(config)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO character_locks (project_id, config_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(project_id) DO UPDATE SET config_json = excluded.config_json,
                 updated_at = excluded.updated_at",
            params![project_id, config_json, now],
        )?;
        Ok(())
    }
}
