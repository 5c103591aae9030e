//! Job repository: CRUD operations for the `jobs` table.

use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub company: String,
    pub title: String,
    pub url: Option<String>,
    pub source: Option<String>,
    pub status: String,
    pub outcome: Option<String>,
    pub closed_at: Option<i64>,
    pub applied_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    /// Creates a fresh job row in the `discovered` status.
    pub fn new(company: &str, title: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            company: company.to_string(),
            title: title.to_string(),
            url: None,
            source: None,
            status: "discovered".to_string(),
            outcome: None,
            closed_at: None,
            applied_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            company: row.get("company")?,
            title: row.get("title")?,
            url: row.get("url")?,
            source: row.get("source")?,
            status: row.get("status")?,
            outcome: row.get("outcome")?,
            closed_at: row.get("closed_at")?,
            applied_at: row.get("applied_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<String>,
    pub source: Option<String>,
    pub exclude_status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, company, title, url, source, status, outcome,
             closed_at, applied_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                job.id,
                job.company,
                job.title,
                job.url,
                job.source,
                job.status,
                job.outcome,
                job.closed_at,
                job.applied_at,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Queries jobs with filters, returning (rows, total_count).
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<JobRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }
        if let Some(ref source) = filter.source {
            conditions.push(format!("source = ?{}", param_values.len() + 1));
            param_values.push(Box::new(source.clone()));
        }
        if let Some(ref exclude_status) = filter.exclude_status {
            conditions.push(format!("status != ?{}", param_values.len() + 1));
            param_values.push(Box::new(exclude_status.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total matching rows.
        let count_sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // Fetch paginated results.
        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM jobs {} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Writes the derived fields recomputed from the stage-event history.
///
/// `status = None` leaves the stored status untouched (used when the
/// event history is empty).
pub fn update_derived(
    db: &Database,
    id: &str,
    status: Option<&str>,
    outcome: Option<&str>,
    closed_at: Option<i64>,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        match status {
            Some(status) => {
                conn.execute(
                    "UPDATE jobs SET status = ?2, outcome = ?3, closed_at = ?4, updated_at = ?5
                     WHERE id = ?1",
                    params![id, status, outcome, closed_at, updated_at],
                )?;
            }
            None => {
                conn.execute(
                    "UPDATE jobs SET outcome = ?2, closed_at = ?3, updated_at = ?4 WHERE id = ?1",
                    params![id, outcome, closed_at, updated_at],
                )?;
            }
        }
        Ok(())
    })
}

/// Stamps the one-time `applied_at` timestamp on a job's first transition.
pub fn set_applied(
    db: &Database,
    id: &str,
    applied_at: &str,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET applied_at = ?2, status = 'applied', updated_at = ?3 WHERE id = ?1",
            params![id, applied_at, updated_at],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_job(id: &str) -> JobRow {
        JobRow {
            id: id.to_string(),
            company: "Acme".to_string(),
            title: "Backend Engineer".to_string(),
            url: Some("https://jobs.example.com/123".to_string()),
            source: Some("linkedin".to_string()),
            status: "discovered".to_string(),
            outcome: None,
            closed_at: None,
            applied_at: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let job = sample_job("job-1");
        insert(&db, &job).unwrap();

        let found = find_by_id(&db, "job-1").unwrap();
        assert!(found.is_some());
        let found = found.unwrap();
        assert_eq!(found.company, "Acme");
        assert_eq!(found.status, "discovered");
        assert_eq!(found.source.as_deref(), Some("linkedin"));
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        let found = find_by_id(&db, "nonexistent").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_new_generates_distinct_ids() {
        let a = JobRow::new("Acme", "Engineer");
        let b = JobRow::new("Acme", "Engineer");
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, "discovered");
    }

    #[test]
    fn test_query_with_status_filter() {
        let db = test_db();
        insert(&db, &sample_job("s1")).unwrap();

        let mut applied = sample_job("s2");
        applied.status = "applied".to_string();
        insert(&db, &applied).unwrap();

        let (rows, total) = query(
            &db,
            &JobFilter {
                status: Some("applied".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "s2");
    }

    #[test]
    fn test_query_with_exclude_status() {
        let db = test_db();
        insert(&db, &sample_job("e1")).unwrap();

        let mut skipped = sample_job("e2");
        skipped.status = "skipped".to_string();
        insert(&db, &skipped).unwrap();

        let (rows, total) = query(
            &db,
            &JobFilter {
                exclude_status: Some("skipped".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, "e1");
    }

    #[test]
    fn test_query_pagination() {
        let db = test_db();
        for i in 0..10 {
            let mut job = sample_job(&format!("p{}", i));
            job.created_at = format!("2026-01-{:02}T00:00:00Z", i + 1);
            insert(&db, &job).unwrap();
        }

        let (rows, total) = query(
            &db,
            &JobFilter {
                limit: Some(3),
                offset: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 10);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_count_by_status() {
        let db = test_db();
        insert(&db, &sample_job("c1")).unwrap();
        insert(&db, &sample_job("c2")).unwrap();

        let mut applied = sample_job("c3");
        applied.status = "applied".to_string();
        insert(&db, &applied).unwrap();

        assert_eq!(count_by_status(&db, "discovered").unwrap(), 2);
        assert_eq!(count_by_status(&db, "applied").unwrap(), 1);
        assert_eq!(count_by_status(&db, "expired").unwrap(), 0);
    }

    #[test]
    fn test_update_derived() {
        let db = test_db();
        insert(&db, &sample_job("d1")).unwrap();

        update_derived(
            &db,
            "d1",
            Some("applied"),
            Some("rejected"),
            Some(3000),
            "2026-01-02T00:00:00Z",
        )
        .unwrap();

        let found = find_by_id(&db, "d1").unwrap().unwrap();
        assert_eq!(found.status, "applied");
        assert_eq!(found.outcome.as_deref(), Some("rejected"));
        assert_eq!(found.closed_at, Some(3000));
    }

    #[test]
    fn test_update_derived_without_status_keeps_status() {
        let db = test_db();
        let mut job = sample_job("d2");
        job.status = "applied".to_string();
        job.outcome = Some("rejected".to_string());
        job.closed_at = Some(3000);
        insert(&db, &job).unwrap();

        update_derived(&db, "d2", None, None, None, "2026-01-02T00:00:00Z").unwrap();

        let found = find_by_id(&db, "d2").unwrap().unwrap();
        assert_eq!(found.status, "applied");
        assert_eq!(found.outcome, None);
        assert_eq!(found.closed_at, None);
    }

    #[test]
    fn test_set_applied() {
        let db = test_db();
        insert(&db, &sample_job("a1")).unwrap();

        set_applied(&db, "a1", "2026-01-05T09:00:00+00:00", "2026-01-05T09:00:00+00:00")
            .unwrap();

        let found = find_by_id(&db, "a1").unwrap().unwrap();
        assert_eq!(found.status, "applied");
        assert_eq!(found.applied_at.as_deref(), Some("2026-01-05T09:00:00+00:00"));
    }
}
