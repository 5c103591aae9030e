//! Stage-event repository: CRUD operations for the `stage_events` table.
//!
//! Events are the source of truth for a job's pipeline history. Listing
//! always orders by `occurred_at` with `rowid` as the tie-breaker, so
//! events logged at the same timestamp replay in insertion order.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw stage-event row from the database.
#[derive(Debug, Clone)]
pub struct StageEventRow {
    pub id: String,
    pub job_id: String,
    pub from_stage: Option<String>,
    pub to_stage: String,
    pub title: String,
    pub occurred_at: i64,
    pub outcome: Option<String>,
    pub group_id: Option<String>,
    /// JSON object serialized as text, or NULL.
    pub metadata: Option<String>,
    pub created_at: String,
}

impl StageEventRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            from_stage: row.get("from_stage")?,
            to_stage: row.get("to_stage")?,
            title: row.get("title")?,
            occurred_at: row.get("occurred_at")?,
            outcome: row.get("outcome")?,
            group_id: row.get("group_id")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new stage event.
pub fn insert(db: &Database, event: &StageEventRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO stage_events (id, job_id, from_stage, to_stage, title,
             occurred_at, outcome, group_id, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.id,
                event.job_id,
                event.from_stage,
                event.to_stage,
                event.title,
                event.occurred_at,
                event.outcome,
                event.group_id,
                event.metadata,
                event.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a stage event by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<StageEventRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM stage_events WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], StageEventRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all stage events for a job in replay order.
pub fn list_for_job(db: &Database, job_id: &str) -> Result<Vec<StageEventRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM stage_events WHERE job_id = ?1
             ORDER BY occurred_at ASC, rowid ASC",
        )?;
        let rows: Vec<StageEventRow> = stmt
            .query_map(params![job_id], StageEventRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Overwrites the mutable fields of an existing event.
pub fn update(db: &Database, event: &StageEventRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE stage_events SET to_stage = ?2, title = ?3, occurred_at = ?4,
             outcome = ?5, group_id = ?6, metadata = ?7
             WHERE id = ?1",
            params![
                event.id,
                event.to_stage,
                event.title,
                event.occurred_at,
                event.outcome,
                event.group_id,
                event.metadata,
            ],
        )?;
        Ok(affected > 0)
    })
}

/// Deletes a stage event, returning whether a row was removed.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM stage_events WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}
