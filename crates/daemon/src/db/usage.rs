use super::{invalid_column, now, parse_timestamp, Database};
use anyhow::Result;
use chrono::{DateTime, Utc};
use engine::pricing::{self, Provider, UsageKind, UsageLine, UsageSummary};
use rusqlite::{params, Row};
use serde::Serialize;

/// One billing event in a project's usage ledger.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub project_id: i64,
    pub generation_id: Option<i64>,
    pub provider: Provider,
    pub kind: UsageKind,
    pub units: f64,
    pub cost_cents: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let provider: String = row.get(3)?;
        let kind: String = row.get(4)?;
        let created_at: String = row.get(8)?;
        Ok(LedgerEntry {
            id: row.get(0)?,
            project_id: row.get(1)?,
            generation_id: row.get(2)?,
            provider: provider.parse().map_err(|_| invalid_column(3))?,
            kind: kind.parse().map_err(|_| invalid_column(4))?,
            units: row.get(5)?,
            cost_cents: row.get(6)?,
            note: row.get(7)?,
            created_at: parse_timestamp(&created_at, 8)?,
        })
    }

    pub fn line(&self) -> UsageLine {
        UsageLine {
            provider: self.provider,
            kind: self.kind,
            units: self.units,
            cost_cents: self.cost_cents,
        }
    }
}

pub struct NewLedgerEntry<'a> {
    pub project_id: i64,
    pub generation_id: Option<i64>,
    pub provider: Provider,
    pub kind: UsageKind,
    pub units: f64,
    pub cost_cents: i64,
    pub note: Option<&'a str>,
}

impl Database {
    pub fn record_usage(&self, entry: &NewLedgerEntry) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO usage_ledger (project_id, generation_id, provider, kind, units, cost_cents, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.project_id,
                entry.generation_id,
                entry.provider.as_str(),
                entry.kind.as_str(),
                entry.units,
                entry.cost_cents,
                entry.note,
                now()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_usage_for_project(&self, project_id: i64) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, generation_id, provider, kind, units, cost_cents, note, created_at
             FROM usage_ledger WHERE project_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![project_id], |row| LedgerEntry::from_row(row))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn usage_summary(&self, project_id: i64) -> Result<UsageSummary> {
        let lines: Vec<UsageLine> = self
            .get_usage_for_project(project_id)?
            .iter()
            .map(LedgerEntry::line)
            .collect();
        Ok(pricing::summarize(&lines))
    }
}
