use super::{invalid_column, now, parse_timestamp, Database};
use anyhow::Result;
use chrono::{DateTime, Utc};
use engine::diff::{diff_timelines, TimelineDiff};
use engine::Timeline;
use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EditLog {
    pub id: i64,
    pub project_id: i64,
    pub diff: TimelineDiff,
    pub created_at: DateTime<Utc>,
}

/// Result of [`Database::edit_timeline`].
#[derive(Debug, Clone)]
pub struct TimelineEdit {
    pub timeline: Timeline,
    pub diff: TimelineDiff,
}

fn read_timeline(conn: &Connection, project_id: i64) -> Result<Option<Timeline>> {
    let mut stmt = conn.prepare("SELECT json_blob FROM timelines WHERE project_id = ?1")?;
    let mut rows = stmt.query_map(params![project_id], |row| row.get::<_, String>(0))?;

    match rows.next() {
        Some(Ok(blob)) => Ok(Some(serde_json::from_str(&blob)?)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}

fn write_timeline(conn: &Connection, project_id: i64, timeline: &Timeline) -> Result<()> {
    let now = now();
    let timeline_json = serde_json::to_string(timeline)?;

    let existing = conn.query_row(
        "SELECT project_id FROM timelines WHERE project_id = ?1",
        params![project_id],
        |row| row.get::<_, i64>(0),
    );

    match existing {
        Ok(_) => {
            conn.execute(
                "UPDATE timelines SET json_blob = ?1, updated_at = ?2 WHERE project_id = ?3",
                params![timeline_json, now, project_id],
            )?;
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            conn.execute(
                "INSERT INTO timelines (project_id, json_blob, updated_at) VALUES (?1, ?2, ?3)",
                params![project_id, timeline_json, now],
            )?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn insert_edit_log(conn: &Connection, project_id: i64, diff: &TimelineDiff) -> Result<()> {
    conn.execute(
        "INSERT INTO edit_logs (project_id, diff_json, created_at) VALUES (?1, ?2, ?3)",
        params![project_id, serde_json::to_string(diff)?, now()],
    )?;
    Ok(())
}

impl Database {
    /// Get timeline for a project
    pub fn get_timeline(&self, project_id: i64) -> Result<Option<Timeline>> {
        let conn = self.conn()?;
        read_timeline(&conn, project_id)
    }

    /// Read, edit and store a project's timeline under one lock and one
    /// transaction. `edit` starts from the stored timeline (or an empty one);
    /// when it fails nothing is written. A non-empty diff goes to the edit log.
    pub fn edit_timeline<E, F>(
        &self,
        project_id: i64,
        edit: F,
    ) -> std::result::Result<TimelineEdit, E>
    where
        E: From<anyhow::Error>,
        F: FnOnce(&mut Timeline) -> std::result::Result<(), E>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(anyhow::Error::from)?;

        let previous = read_timeline(&tx, project_id)?.unwrap_or_default();
        let mut timeline = previous.clone();
        edit(&mut timeline)?;

        let diff = diff_timelines(&previous, &timeline);
        write_timeline(&tx, project_id, &timeline)?;
        if !diff.is_empty() {
            insert_edit_log(&tx, project_id, &diff)?;
        }
        tx.commit().map_err(anyhow::Error::from)?;

        Ok(TimelineEdit { timeline, diff })
    }

    /// Newest first.
    pub fn get_edit_logs(&self, project_id: i64) -> Result<Vec<EditLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, diff_json, created_at FROM edit_logs
             WHERE project_id = ?1 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            let diff_json: String = row.get(2)?;
            let created_at: String = row.get(3)?;
            Ok(EditLog {
                id: row.get(0)?,
                project_id: row.get(1)?,
                diff: serde_json::from_str(&diff_json).map_err(|_| invalid_column(2))?,
                created_at: parse_timestamp(&created_at, 3)?,
            })
        })?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}
